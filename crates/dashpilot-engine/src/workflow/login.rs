use super::actions::{Attempt, StepActions};
use crate::config::{Credentials, DashpilotConfig};
use crate::dashboard::DashboardLifecycle;
use crate::driver::Driver;
use crate::error::{Error, Result};
use crate::resolution::retry_driver;
use crate::runlog::SharedLog;

/// Sign in and confirm the dashboard page is showing.
///
/// Success is a non-empty sidebar listing. When nothing is listed the
/// operator decides; a "no" is recorded together with their description of
/// the page.
pub async fn log_in<D: Driver + ?Sized>(
    driver: &mut D,
    lifecycle: &mut DashboardLifecycle,
    actions: &StepActions,
    config: &DashpilotConfig,
    credentials: &Credentials,
    log: &SharedLog,
) -> Result<String> {
    let url = config.target.login_url()?;
    log.record(&format!("Opening login page {}", url));
    retry_driver!(actions.retry(), "open login page", driver.navigate(&url))?;
    driver.settle(config.resolution.settle()).await;

    let selectors = &config.selectors.login;
    let mut attempt = actions
        .fill(driver, "email field", &selectors.email, &credentials.email)
        .await?;
    if attempt == Attempt::Done {
        attempt = actions
            .fill(driver, "password field", &selectors.password, &credentials.password)
            .await?;
    }
    if attempt == Attempt::Done {
        attempt = actions
            .click(driver, "login button", &selectors.submit)
            .await?;
    }

    let manual = match attempt {
        Attempt::Done => {
            log.record("Login form submitted");
            driver.settle(config.resolution.settle()).await;
            false
        }
        Attempt::Missing(detail) => {
            log.record(&format!("Could not submit the login form ({})", detail));
            let prompt = format!(
                "Could not log in automatically ({}). Please log in in the browser. Are you now on the main dashboard page?",
                detail
            );
            if !lifecycle.gate_mut().confirm(&prompt).await? {
                return Err(Error::SelectorExhausted {
                    action: "log in".to_string(),
                    detail,
                });
            }
            true
        }
    };

    let listed = lifecycle.list(driver).await?;
    if !listed.is_empty() {
        return Ok(format!("{} dashboard(s) listed", listed.len()));
    }
    if manual {
        return Ok("confirmed by operator".to_string());
    }

    let gate = lifecycle.gate_mut();
    if gate
        .confirm("Did the login work? Are you now on the main dashboard page?")
        .await?
    {
        return Ok("confirmed by operator".to_string());
    }
    let seen = gate.describe("What do you see on the page?").await?;
    Err(Error::SelectorExhausted {
        action: "log in".to_string(),
        detail: format!("no dashboards listed; operator reported: {}", seen),
    })
}
