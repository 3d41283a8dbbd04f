//! Captive portal + NAS simulation driving a Lanyard engine.
//!
//! Plays one session's life in fast-forward: a voucher is redeemed, the
//! device roams to a randomized MAC, goes silent long enough to pause,
//! comes back, and is finally disconnected by an operator. Heartbeat
//! intervals and the sweep cadence are compressed to seconds so the whole
//! story runs in about ten seconds of wall time.
//!
//! Run with: `cargo run -p portal-sim`

use std::time::{Duration, SystemTime};

use lanyard::prelude::*;
use lanyard::{HeartbeatTiers, PackageId};

/// The voucher the "customer" bought: one day of access.
fn demo_grant() -> VoucherGrant {
    VoucherGrant {
        voucher_code: VoucherCode::new("VCH-DEMO001"),
        phone_number: "255700000042".to_string(),
        package_id: PackageId(1),
        duration_days: 1,
        radius_username: "255700000042_VCH-DEMO001".to_string(),
    }
}

#[tokio::main]
async fn main() -> Result<(), EngineError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    // Compressed timing: every package tier heartbeats at 2s, and the
    // sweeper passes every second.
    let engine = SessionEngine::new(EngineConfig {
        policy: SessionPolicy {
            heartbeat_tiers: HeartbeatTiers::new(vec![], Duration::from_secs(2)),
            ..SessionPolicy::default()
        },
        ..EngineConfig::default()
    });
    let sweeper = spawn_sweeper(
        engine.clone(),
        SweepConfig {
            interval: Duration::from_secs(1),
            initial_jitter_ms: 0,
        },
    );

    // The accounting bridge: prints every lifecycle event as the record
    // it would produce.
    let mut events = engine.subscribe();
    let bridge = tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match event.accounting_kind() {
                Some(kind) => tracing::info!(
                    token = %event.token(),
                    status = %event.status(),
                    ?kind,
                    "accounting record"
                ),
                None => tracing::info!(
                    token = %event.token(),
                    status = %event.status(),
                    "internal transition (no accounting record)"
                ),
            }
        }
    });

    // 1. Portal: voucher validated, session opened.
    let mac_factory: MacAddr = "02:00:5E:10:00:01".parse().expect("literal MAC");
    let ip_first: std::net::IpAddr = "10.4.0.17".parse().expect("literal IP");
    let snap = engine
        .create_session(&demo_grant(), mac_factory, ip_first, SystemTime::now())
        .await?;
    let token = snap.token.clone();
    tracing::info!(%token, remaining_secs = snap.remaining_secs, "session opened");

    // 2. NAS: device heartbeats, then roams to a randomized MAC.
    for _ in 0..2 {
        tokio::time::sleep(Duration::from_secs(1)).await;
        engine
            .record_heartbeat(&HeartbeatReport {
                token: token.clone(),
                timestamp: SystemTime::now(),
            })
            .await?;
    }
    let mac_random: MacAddr = "DA:1A:4C:22:7E:90".parse().expect("literal MAC");
    engine
        .record_activity(&ActivityReport {
            token: token.clone(),
            mac: mac_random,
            ip: "10.4.0.99".parse().expect("literal IP"),
            timestamp: SystemTime::now(),
        })
        .await?;
    let factory_allowed = engine.is_mac_allowed(&token, mac_factory).await?;
    let random_allowed = engine.is_mac_allowed(&token, mac_random).await?;
    tracing::info!(
        both_macs_allowed = factory_allowed && random_allowed,
        "MAC randomization absorbed without re-auth"
    );

    // 3. Device goes silent: the sweeper pauses the session after three
    //    missed heartbeats, then flags it reconnecting.
    tokio::time::sleep(Duration::from_secs(6)).await;
    let paused = engine.snapshot(&token, SystemTime::now()).await?;
    tracing::info!(status = %paused.status, disconnections = paused.disconnection_count, "device went quiet");

    // 4. Device returns: one heartbeat resumes the session seamlessly.
    engine
        .record_heartbeat(&HeartbeatReport {
            token: token.clone(),
            timestamp: SystemTime::now(),
        })
        .await?;

    // 5. Operator disconnect, then the nightly archive drain.
    engine
        .terminate(&token, "demo complete", SystemTime::now())
        .await?;
    let archived = engine.drain_archived().await;
    tracing::info!(
        archived = archived.len(),
        total_online_secs = archived[0].total_online_secs,
        mac_changes = archived[0].mac_changes,
        "session archived"
    );

    sweeper.shutdown().await;
    drop(engine);
    let _ = bridge.await;
    Ok(())
}
