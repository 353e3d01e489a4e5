use crate::infra::{seed_marketplace, MarketplaceServices};
use chrono::Utc;
use clap::Args;
use lease_market::activity::{ListingActivity, ListingActivityBoard};
use lease_market::config::AppConfig;
use lease_market::error::AppError;
use lease_market::leases::{SignatureRequest, Signer};
use lease_market::listings::{BrokerId, EnrichedListing, ListingDraft, MarketListingUpdate};
use lease_market::store::Fields;
use serde_json::{json, Value};

/// 1x1 transparent PNG used for the publish step.
const SAMPLE_IMAGE: &str = "data:image/png;base64,iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAQAAAC1HAwCAAAAC0lEQVR42mNkYAAAAAYAAjCB0C8AAAAASUVORK5CYII=";

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// Broker whose listings are aggregated.
    #[arg(long, default_value = "broker-a")]
    pub(crate) broker: String,
    /// Skip publishing a new listing with uploaded media.
    #[arg(long)]
    pub(crate) skip_publish: bool,
    /// Skip the lease signature round trip.
    #[arg(long)]
    pub(crate) skip_lease: bool,
}

pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let services = MarketplaceServices::in_memory(&config.marketplace);
    let now = Utc::now();
    seed_marketplace(&services.store, now);

    println!("Lease market demo");
    println!("Broker: {}", args.broker);

    let broker = BrokerId(args.broker);
    let listings = services.listings.retrieve_listings(&broker).await?;
    println!("\nListings ({}):", listings.len());

    let mut board = ListingActivityBoard::new();
    for listing in &listings {
        render_listing(listing);

        let id = &listing.listing.id;
        board.apply(services.activity.fetch_offers(id).await?);
        board.apply(services.activity.fetch_applications(id).await?);
        board.apply(services.activity.fetch_appointments(id).await?);
        board.apply(services.activity.fetch_recent_appointments(id, now).await?);
        if let Some(views) = services.activity.fetch_views(id).await? {
            board.apply(views);
        }
        if let Some(activity) = board.get(id) {
            render_activity(activity);
        }
    }

    if !args.skip_publish {
        let mut fields = Fields::new();
        fields.insert("title".to_string(), json!("Canal house"));
        let update = MarketListingUpdate {
            draft: ListingDraft {
                fields,
                ..ListingDraft::default()
            },
            images_to_upload: vec![SAMPLE_IMAGE.to_string()],
            ..MarketListingUpdate::default()
        };
        let published = services.listings.update_market_listing(update).await?;
        println!("\nPublished listing {}", published.id.0);
        for path in published.image_urls.unwrap_or_default() {
            println!("  image: {path}");
        }
    }

    if !args.skip_lease {
        let request = SignatureRequest {
            application_id: "application-1".to_string(),
            template_id: Some("tpl-standard".to_string()),
            signers: vec![Signer::new("Jordan Vale", "jordan@example.com", "Tenant")],
            title: "Harbor loft lease".to_string(),
            ..SignatureRequest::default()
        };
        let claim = services.leases.send(request).await?;
        println!("\nLease sent; claim URL {} (client {})", claim.claim_url, claim.client_id);

        let lease_request = services.leases.await_lease_request("application-1").await?;
        println!(
            "Lease request recorded: {}",
            lease_request
                .get("signature_request_id")
                .and_then(Value::as_str)
                .unwrap_or("unknown")
        );
    }

    Ok(())
}

fn render_listing(listing: &EnrichedListing) {
    let title = listing
        .listing
        .attributes
        .get("title")
        .and_then(Value::as_str)
        .unwrap_or("untitled");
    let mut brokers: Vec<&str> = listing
        .brokers
        .iter()
        .map(|profile| {
            profile
                .attributes
                .get("name")
                .and_then(Value::as_str)
                .unwrap_or(profile.id.0.as_str())
        })
        .collect();
    brokers.sort_unstable();

    println!("- {} ({})", title, listing.listing.id.0);
    println!("    brokers: {}", brokers.join(", "));
}

fn render_activity(activity: &ListingActivity) {
    println!(
        "    offers: {}, applications: {}, appointments: {} ({} recent)",
        activity.offers.len(),
        activity.applications.len(),
        activity.appointments.len(),
        activity.recent_appointments.len(),
    );
    if let Some(views) = &activity.views {
        let total = views.0.get("total").cloned().unwrap_or(Value::Null);
        println!("    views: {total}");
    }
}
