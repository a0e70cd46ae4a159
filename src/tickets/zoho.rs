//! src/tickets/zoho.rs
use reqwest::Client;
use serde::Deserialize;

use super::TicketRecord;
use crate::config::ZohoCredentials;
use crate::errors::TrackerError;

const TRACKER: &str = "Zoho";

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct ZohoTicket {
    #[serde(default)]
    ticket_number: Option<String>,
    #[serde(default)]
    subject: Option<String>,
}

/// Zoho only gives us the subject line.
pub async fn fetch_ticket(
    client: &Client,
    creds: &ZohoCredentials,
    ticket_id: &str,
) -> Result<TicketRecord, TrackerError> {
    let url = format!(
        "{}/api/v1/tickets/{}",
        creds.base_url.trim_end_matches('/'),
        ticket_id
    );
    let res = client
        .get(url)
        .header("Authorization", format!("Zoho-oauthtoken {}", creds.access_token))
        .header("orgId", &creds.org_id)
        .send()
        .await
        .map_err(|error| TrackerError::Transport {
            tracker: TRACKER,
            error,
        })?;

    let status = res.status();
    if !status.is_success() {
        let body = res.text().await.unwrap_or_default();
        return Err(TrackerError::Status {
            tracker: TRACKER,
            status,
            body,
        });
    }

    let ticket = res
        .json::<ZohoTicket>()
        .await
        .map_err(|error| TrackerError::Decode {
            tracker: TRACKER,
            error,
        })?;
    let key = ticket.ticket_number.unwrap_or_else(|| ticket_id.to_string());
    Ok(TicketRecord::subject_only(
        key,
        ticket.subject.unwrap_or_default(),
    ))
}
