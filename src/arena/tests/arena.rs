use std::time::Duration;

use agent::{
    config::{MatchConfig, Rules, StrategyConfig},
    controller::{MatchOutcome, Verdict},
};
use arena::{
    entrypoint::ArenaServer,
    service::{
        duel::challenge,
        poller::{poll_once, PollSettings},
        roster::{OpponentRecord, Roster},
    },
};
use common::{model::game::UnitType, utility::random_address};

fn config(name: &str, strategy: StrategyConfig) -> MatchConfig {
    MatchConfig {
        name: name.to_owned(),
        rules: Rules::FixedCount { rounds: 10 },
        strategy,
        seed: Some(1),
        ..MatchConfig::default()
    }
}

fn fixed(unit: UnitType) -> StrategyConfig {
    StrategyConfig::Fixed { unit }
}

#[tokio::test]
async fn test_challenge_server() {
    let server = ArenaServer::new(config("Host", fixed(UnitType::Tiefighter)))
        .await
        .unwrap();

    let outcome = challenge(
        &server.address,
        config("Guest", fixed(UnitType::Destroyer)),
        Duration::from_secs(1),
    )
    .await
    .unwrap();
    let MatchOutcome::Completed(result) = outcome else {
        panic!("match aborted");
    };
    assert_eq!(result.opponent, "Host");
    assert_eq!(result.tally.wins, 10);
    assert_eq!(result.verdict, Verdict::Success);

    // The host records its side once the match task finishes.
    let mut record = None;
    for _ in 0..50 {
        record = server.roster.get("127.0.0.1").await;
        if record.is_some_and(|r| r.completed == 1) {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(
        record,
        Some(OpponentRecord {
            attempts: 1,
            completed: 1,
            successes: 0,
            aborted: 0
        })
    );
    server.shutdown();
}

#[tokio::test]
async fn test_poll_counts_online_hosts_only() {
    let server = ArenaServer::new(config("Host", StrategyConfig::RoundRobin))
        .await
        .unwrap();
    let offline = random_address().await.unwrap();

    let settings = PollSettings {
        hosts: vec![server.address.clone(), offline.clone()],
        port: 8080,
        interval: Duration::from_secs(60),
        connect_timeout: Duration::from_millis(1000),
    };
    let roster = Roster::new();
    let config = config("Poller", StrategyConfig::Random);
    poll_once(&settings, &config, &roster).await;
    poll_once(&settings, &config, &roster).await;

    let online = roster.get(&server.address).await.unwrap();
    assert_eq!(online.attempts, 2);
    assert_eq!(online.completed, 2);
    let absent = roster.get(&offline).await.unwrap();
    assert_eq!(absent.attempts, 2);
    assert_eq!(absent.completed, 0);

    let mut expected = vec![
        format!("{} : 2", server.address),
        format!("{} : 0", offline),
    ];
    expected.sort();
    assert_eq!(roster.table().await, expected);
    server.shutdown();
}
