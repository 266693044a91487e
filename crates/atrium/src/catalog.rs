//! The demo module catalog and the delivery collaborator that serves it.
use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use atrium_core::extension::{CodeDelivery, DeliveryContext, DeliveryError, ModuleDescriptor, SlotWidgetDeclaration};
use atrium_core::slots::SlotType;
use log::{error, info};

/// Version the host publishes its theme under.
pub const THEME_VERSION: &str = "1.2.0";

/// Time between fetching a remote entry and its code registering.
const DEMO_STARTUP_DELAY_MS: u64 = 300;

/// Entry function of a delivered module.
pub type EntryFn = fn(&DeliveryContext) -> Result<(), DeliveryError>;

/// Modules known without a `--config` file.
///
/// Besides the two addon crates this lists one remote module whose entry is
/// never served and one local module that was left out of the build, so
/// both failure cards can be seen from the CLI.
pub fn demo_modules() -> Vec<ModuleDescriptor> {
    vec![
        atrium_weather::descriptor(),
        atrium_vegetation_prime::descriptor(),
        ModuleDescriptor::remote(
            "field-notes",
            "Field Notes",
            "https://addons.atrium.example/field-notes/remoteEntry.js",
        )
        .with_icon("notebook")
        .with_declaration(SlotWidgetDeclaration::new(
            "field-notes",
            SlotType::BottomPanel,
            "recent-notes",
            "RecentNotes",
        )),
        ModuleDescriptor::local("legacy-reports", "Legacy Reports")
            .with_route("/reports")
            .with_main_view("ReportsPage")
            .with_widget(SlotType::BottomPanel, "report-queue", "ReportQueue"),
    ]
}

/// Serves remote entries from a fixed table of entry functions.
///
/// Fetching succeeds immediately; the entry runs on its own task after
/// `startup_delay`, like a script that registers once it has evaluated.
pub struct CatalogDelivery {
    entries: HashMap<String, EntryFn>,
    startup_delay: Duration,
}

impl CatalogDelivery {
    pub fn new(startup_delay: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            startup_delay,
        }
    }

    pub fn with_entry(mut self, remote_entry: impl Into<String>, entry: EntryFn) -> Self {
        self.entries.insert(remote_entry.into(), entry);
        self
    }

    pub fn demo() -> Self {
        Self::new(Duration::from_millis(DEMO_STARTUP_DELAY_MS))
            .with_entry(atrium_vegetation_prime::REMOTE_ENTRY, atrium_vegetation_prime::register)
    }
}

#[async_trait]
impl CodeDelivery for CatalogDelivery {
    async fn deliver(&self, context: DeliveryContext) -> Result<(), DeliveryError> {
        let entry = *self
            .entries
            .get(context.remote_entry())
            .ok_or_else(|| DeliveryError::new(format!("failed to fetch '{}': 404 Not Found", context.remote_entry())))?;
        info!("Fetched {}", context.remote_entry());

        let delay = self.startup_delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Err(e) = entry(&context) {
                error!("Entry {} failed: {}", context.remote_entry(), e);
            }
        });
        Ok(())
    }
}
