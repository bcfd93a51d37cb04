use super::actions::{Attempt, StepActions, complete_manually};
use crate::config::DashpilotConfig;
use crate::confirm::ConfirmationGate;
use crate::driver::Driver;
use crate::error::Result;
use crate::resolution::{Locator, SelectorCandidates};
use crate::runlog::SharedLog;
use crate::selectors::{candidates, templated};
use tracing::debug;

/// Set one widget option: a native `<select>` if the layout has one,
/// otherwise the clickable entry.
async fn choose<D: Driver + ?Sized>(
    driver: &mut D,
    actions: &StepActions,
    selects: &[Locator],
    clicks: &SelectorCandidates,
    choices: &[String],
) -> Result<Attempt> {
    if !selects.is_empty() {
        let list = candidates(&format!("{} select", clicks.label), selects);
        match actions.select(driver, &list, choices).await? {
            Attempt::Done => return Ok(Attempt::Done),
            Attempt::Missing(detail) => debug!("Falling back to clicking: {}", detail),
        }
    }
    actions.click_candidates(driver, clicks).await
}

/// Open the dashboard editor and start a widget from the configured
/// integration.
pub async fn add_widget<D: Driver + ?Sized>(
    driver: &mut D,
    gate: &mut ConfirmationGate,
    actions: &StepActions,
    config: &DashpilotConfig,
    log: &SharedLog,
    dashboard: &str,
) -> Result<String> {
    let settle = config.resolution.settle();
    let marker = config.target.edit_marker.as_str();

    let url = driver.current_url().await?;
    if !url.contains(marker) {
        log.record(&format!("Not on an edit page ({}); opening '{}'", url, dashboard));
        let opened = actions
            .click_where(
                driver,
                "dashboard link",
                &config.selectors.dashboard.sidebar_links,
                |e| e.text.trim() == dashboard,
            )
            .await?;
        driver.settle(settle).await;
        let attempt = match opened {
            Attempt::Done => {
                let url = driver.current_url().await?;
                if url.contains(marker) {
                    Attempt::Done
                } else {
                    Attempt::Missing(format!("still on {}", url))
                }
            }
            missing => missing,
        };
        complete_manually(
            gate,
            log,
            &format!("open the editor for '{}'", dashboard),
            attempt,
        )
        .await?;
    }

    let widget = &config.selectors.widget;
    let attempt = actions
        .click(driver, "add widget button", &widget.add_widget)
        .await?;
    complete_manually(gate, log, "click Add widget", attempt).await?;
    driver.settle(settle).await;

    let settings = &config.workflow.widget;
    let integration = &settings.integration;
    let list = templated(
        "integration",
        &widget.integration,
        &[
            ("service", settings.integration_service.as_deref()),
            ("integration", Some(integration.as_str())),
        ],
    );
    let attempt = actions.click_candidates(driver, &list).await?;
    complete_manually(gate, log, &format!("pick the {} integration", integration), attempt).await?;
    driver.settle(settle).await;

    log.record(&format!("Widget started from {}", integration));
    Ok(format!("{} integration selected", integration))
}

/// Pick the metric, the time period and the status filter, then open the
/// filter panel.
pub async fn configure_widget<D: Driver + ?Sized>(
    driver: &mut D,
    gate: &mut ConfirmationGate,
    actions: &StepActions,
    config: &DashpilotConfig,
    log: &SharedLog,
) -> Result<String> {
    let settle = config.resolution.settle();
    let settings = &config.workflow.widget;
    let widget = &config.selectors.widget;
    let mut done = Vec::new();

    let metric = &settings.metric;
    let list = templated("metric", &widget.metric, &[("metric", Some(metric.as_str()))]);
    let attempt = choose(driver, actions, &widget.metric_select, &list, &settings.choices(metric)).await?;
    complete_manually(gate, log, &format!("select the {} metric", metric), attempt).await?;
    driver.settle(settle).await;
    done.push(format!("metric {}", metric));

    if let Some(period) = &settings.time_period {
        let list = templated("time period", &widget.time_period, &[("period", Some(period.as_str()))]);
        let attempt = choose(
            driver,
            actions,
            &widget.time_period_select,
            &list,
            &settings.choices(period),
        )
        .await?;
        complete_manually(gate, log, &format!("set the time period to {}", period), attempt).await?;
        driver.settle(settle).await;
        done.push(format!("period {}", period));
    }

    if let Some(status) = &settings.status {
        let list = templated("status filter", &widget.status, &[("status", Some(status.as_str()))]);
        let attempt = choose(
            driver,
            actions,
            &widget.status_select,
            &list,
            &settings.choices(status),
        )
        .await?;
        complete_manually(gate, log, &format!("filter on {} tickets", status), attempt).await?;
        driver.settle(settle).await;
        done.push(format!("status {}", status));
    }

    if settings.add_filter {
        let attempt = actions
            .click(driver, "add filter button", &widget.add_filter)
            .await?;
        complete_manually(gate, log, "open Add filter", attempt).await?;
        driver.settle(settle).await;
        done.push("filter panel opened".to_string());
    }

    let summary = done.join(", ");
    log.record(&format!("Widget configured: {}", summary));
    Ok(summary)
}
