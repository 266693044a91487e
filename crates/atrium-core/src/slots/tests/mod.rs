#[cfg(test)]
mod visibility_tests;

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use crate::slots::{SlotError, SlotType};

    #[test]
    fn test_slot_type_round_trips_through_str() {
        for slot in SlotType::ALL {
            assert_eq!(SlotType::from_str(slot.as_str()).expect("known slot"), slot);
        }
        assert_eq!(SlotType::ContextPanel.to_string(), "context-panel");
    }

    #[test]
    fn test_unknown_slot_name() {
        match SlotType::from_str("sidebar") {
            Err(SlotError::UnknownSlot { name, known }) => {
                assert_eq!(name, "sidebar");
                assert!(known.contains("map-layer"));
            }
            other => panic!("expected UnknownSlot, got {:?}", other),
        }
    }
}
