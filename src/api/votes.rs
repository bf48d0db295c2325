use crate::models::votes::AllVotes;
use anyhow::Result;
use log::{debug, error, info};
use reqwest::Client;

pub async fn get_all_votes(client: &Client, base_url: &str) -> Result<AllVotes, anyhow::Error> {
    let url = format!("{}/api/voting", base_url);
    debug!("Fetching current voting: {}", url);
    let resp = client.get(&url).send().await?;

    if resp.status().is_success() {
        let response = resp.json::<AllVotes>().await?;
        info!("Voting payload received successfully");
        Ok(response)
    } else {
        error!("Failed to fetch voting: {}", resp.status());
        Err(anyhow::anyhow!("Failed to fetch voting"))
    }
}

pub async fn get_vote(
    client: &Client,
    base_url: &str,
    vote_id: &str,
) -> Result<AllVotes, anyhow::Error> {
    let url = format!("{}/api/voting/{}", base_url, vote_id);
    debug!("Fetching voting {}: {}", vote_id, url);
    let resp = client.get(&url).send().await?;

    if resp.status().is_success() {
        let response = resp.json::<AllVotes>().await?;
        info!("Voting {} received successfully", vote_id);
        Ok(response)
    } else {
        error!("Failed to fetch voting {}: {}", vote_id, resp.status());
        Err(anyhow::anyhow!("Failed to fetch voting {}", vote_id))
    }
}
