use std::sync::Arc;

use anyhow::Result;
use tracing::warn;

use crate::{daemon::storage::entities::UNKNOWN_APP, window_api::ForegroundApp};

use super::screen::ScreenReader;

/// What the desktop looked like at one point in time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DesktopSample {
    pub app_name: Arc<str>,
    pub text: String,
}

/// Bundles the foreground application inspector and the screen reader into a single
/// "what is going on right now" query.
pub struct DesktopSampler {
    foreground: Box<dyn ForegroundApp>,
    screen: Box<dyn ScreenReader>,
}

impl DesktopSampler {
    pub fn new(foreground: Box<dyn ForegroundApp>, screen: Box<dyn ScreenReader>) -> Self {
        Self { foreground, screen }
    }

    /// Failing to identify the application is never an error, the sample is attributed to
    /// [UNKNOWN_APP] instead. Failing to read the screen is.
    pub async fn sample(&mut self) -> Result<DesktopSample> {
        let app_name: Arc<str> = match self.foreground.foreground_app() {
            Ok(name) if !name.trim().is_empty() => name.trim().into(),
            Ok(_) => UNKNOWN_APP.into(),
            Err(e) => {
                warn!("Couldn't identify the foreground application {e:?}");
                UNKNOWN_APP.into()
            }
        };

        let text = self.screen.read_screen().await?;

        Ok(DesktopSample { app_name, text })
    }
}
