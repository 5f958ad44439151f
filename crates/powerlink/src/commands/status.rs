//! Status poll and arm/disarm handlers.

use serde::Serialize;

use powerlink_api::{CanonicalStatus, PowerLinkClient};

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output::{self, FieldRow};

#[derive(Debug, Serialize)]
struct StatusReport<'a> {
    profile: &'a str,
    protocol: String,
    status: CanonicalStatus,
    label: String,
}

pub async fn show(
    client: &PowerLinkClient,
    profile: &str,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let status = client.get_status().await?;
    let color = output::should_color(&global.color);

    let report = StatusReport {
        profile,
        protocol: client.protocol().revision.to_string(),
        status,
        label: status.to_string(),
    };

    let out = output::render_single(
        &global.output,
        &report,
        |r| {
            output::render_fields(vec![
                FieldRow {
                    field: "Profile",
                    value: r.profile.to_owned(),
                },
                FieldRow {
                    field: "Protocol",
                    value: r.protocol.clone(),
                },
                FieldRow {
                    field: "Status",
                    value: output::paint_status(r.status, color),
                },
            ])
        },
        |r| r.label.clone(),
    );
    output::print_output(&out, global.quiet);
    Ok(())
}

pub async fn set(
    client: &PowerLinkClient,
    target: CanonicalStatus,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    client.set_status(target).await?;

    if !global.quiet {
        let color = output::should_color(&global.color);
        eprintln!("✓ Panel set to {}", output::paint_status(target, color));
    }
    Ok(())
}
