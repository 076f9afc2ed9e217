//! Behaviour every key-value backend must share.

#![allow(dead_code)]

use std::time::Duration;

use quill_kv::{KeyValueStore, KeyValueStoreExt, KvError};
use serde::{Deserialize, Serialize};

/// Sleep that outlasts a 1s TTL by a margin well under a second.
pub const PAST_ONE_SECOND: Duration = Duration::from_millis(1300);

#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub name: String,
    pub posts: u32,
}

pub async fn check_set_get(kv: &dyn KeyValueStore, prefix: &str) {
    let key = format!("{prefix}/set_get");
    kv.set(&key, "value").await.unwrap();
    assert_eq!(kv.get(&key).await.unwrap(), "value");
    assert!(kv.exists(&key).await.unwrap());

    kv.set(&key, "replaced").await.unwrap();
    assert_eq!(kv.get(&key).await.unwrap(), "replaced");
}

pub async fn check_missing(kv: &dyn KeyValueStore, prefix: &str) {
    let key = format!("{prefix}/missing");
    assert!(kv.get(&key).await.unwrap_err().is_not_found());
    assert!(
        kv.get_ex(&key, Duration::from_secs(1))
            .await
            .unwrap_err()
            .is_not_found()
    );
    assert!(!kv.exists(&key).await.unwrap());
    assert!(kv.delete(&key).await.unwrap_err().is_not_found());
}

pub async fn check_set_ex_expires(kv: &dyn KeyValueStore, prefix: &str) {
    let key = format!("{prefix}/set_ex");
    kv.set_ex(&key, "short", Duration::from_secs(1)).await.unwrap();
    assert_eq!(kv.get(&key).await.unwrap(), "short");
    assert!(kv.exists(&key).await.unwrap());

    tokio::time::sleep(PAST_ONE_SECOND).await;

    assert!(kv.get(&key).await.unwrap_err().is_not_found());
    assert!(!kv.exists(&key).await.unwrap());
    assert!(kv.delete(&key).await.unwrap_err().is_not_found());
}

/// A 1s entry written mid-second must be gone 1.3s later.
pub async fn check_expiry_is_not_rounded_up(kv: &dyn KeyValueStore, prefix: &str) {
    let key = format!("{prefix}/mid_second");
    let now = time::OffsetDateTime::now_utc();
    let to_half = (1_500_000_000 - i64::from(now.nanosecond())).rem_euclid(1_000_000_000);
    tokio::time::sleep(Duration::from_nanos(to_half as u64)).await;

    kv.set_ex(&key, "brief", Duration::from_secs(1)).await.unwrap();
    assert_eq!(kv.get(&key).await.unwrap(), "brief");

    tokio::time::sleep(PAST_ONE_SECOND).await;

    assert!(kv.get(&key).await.unwrap_err().is_not_found());
    assert!(!kv.exists(&key).await.unwrap());
}

pub async fn check_get_ex_slides_expiry(kv: &dyn KeyValueStore, prefix: &str) {
    let key = format!("{prefix}/get_ex");
    kv.set(&key, "sliding").await.unwrap();
    assert_eq!(
        kv.get_ex(&key, Duration::from_secs(1)).await.unwrap(),
        "sliding"
    );
    assert_eq!(kv.get(&key).await.unwrap(), "sliding");

    tokio::time::sleep(PAST_ONE_SECOND).await;

    assert!(kv.get(&key).await.unwrap_err().is_not_found());
}

pub async fn check_get_ex_extends_lease(kv: &dyn KeyValueStore, prefix: &str) {
    let key = format!("{prefix}/lease");
    kv.set_ex(&key, "leased", Duration::from_secs(1)).await.unwrap();
    assert_eq!(
        kv.get_ex(&key, Duration::from_secs(60)).await.unwrap(),
        "leased"
    );

    tokio::time::sleep(PAST_ONE_SECOND).await;

    assert_eq!(kv.get(&key).await.unwrap(), "leased");
}

pub async fn check_set_clears_expiry(kv: &dyn KeyValueStore, prefix: &str) {
    let key = format!("{prefix}/persist");
    kv.set_ex(&key, "temporary", Duration::from_secs(1)).await.unwrap();
    kv.set(&key, "permanent").await.unwrap();

    tokio::time::sleep(PAST_ONE_SECOND).await;

    assert_eq!(kv.get(&key).await.unwrap(), "permanent");
}

pub async fn check_delete(kv: &dyn KeyValueStore, prefix: &str) {
    let key = format!("{prefix}/delete");
    kv.set(&key, "doomed").await.unwrap();
    kv.delete(&key).await.unwrap();
    assert!(kv.get(&key).await.unwrap_err().is_not_found());
    assert!(kv.delete(&key).await.unwrap_err().is_not_found());
}

pub async fn check_invalid_ttl(kv: &dyn KeyValueStore, prefix: &str) {
    let key = format!("{prefix}/ttl");
    let err = kv.set_ex(&key, "v", Duration::ZERO).await.unwrap_err();
    assert!(err.is_invalid_ttl());
    assert!(!kv.exists(&key).await.unwrap());

    kv.set(&key, "v").await.unwrap();
    let err = kv.get_ex(&key, Duration::from_micros(10)).await.unwrap_err();
    assert!(err.is_invalid_ttl());
    assert_eq!(kv.get(&key).await.unwrap(), "v");
}

pub async fn check_json_values(kv: &dyn KeyValueStore, prefix: &str) {
    let key = format!("{prefix}/json");
    let profile = Profile {
        name: "ada".to_string(),
        posts: 3,
    };

    kv.set_value(&key, &profile).await.unwrap();
    assert_eq!(kv.get_value::<Profile>(&key).await.unwrap(), profile);
    assert_eq!(
        kv.get_value_ex::<Profile>(&key, Duration::from_secs(60))
            .await
            .unwrap(),
        profile
    );

    kv.set_value_ex(&key, &vec![1, 2, 3], Duration::from_secs(60))
        .await
        .unwrap();
    assert_eq!(kv.get_value::<Vec<u32>>(&key).await.unwrap(), vec![1, 2, 3]);

    kv.set(&key, "not json").await.unwrap();
    let err = kv.get_value::<Profile>(&key).await.unwrap_err();
    assert!(matches!(err, KvError::Serialization(_)));

    let missing = format!("{prefix}/json_missing");
    assert!(
        kv.get_value::<Profile>(&missing)
            .await
            .unwrap_err()
            .is_not_found()
    );
}

/// Runs a fixed operation sequence and records every outcome.
pub async fn trace(kv: &dyn KeyValueStore, prefix: &str) -> Vec<String> {
    fn outcome<T: std::fmt::Debug>(result: Result<T, KvError>) -> String {
        match result {
            Ok(value) => format!("ok {value:?}"),
            Err(KvError::NotFound { .. }) => "not found".to_string(),
            Err(KvError::InvalidTtl(_)) => "invalid ttl".to_string(),
            Err(e) => format!("error {e}"),
        }
    }

    let a = format!("{prefix}/trace_a");
    let b = format!("{prefix}/trace_b");
    let ttl = Duration::from_secs(1);
    let mut out = Vec::new();

    out.push(outcome(kv.get(&a).await));
    out.push(outcome(kv.exists(&a).await));
    out.push(outcome(kv.set(&a, "1").await));
    out.push(outcome(kv.get(&a).await));
    out.push(outcome(kv.set_ex(&b, "2", ttl).await));
    out.push(outcome(kv.get_ex(&b, ttl).await));
    out.push(outcome(kv.exists(&b).await));
    out.push(outcome(kv.set_ex(&b, "3", Duration::ZERO).await));
    out.push(outcome(kv.delete(&a).await));
    out.push(outcome(kv.delete(&a).await));
    out.push(outcome(kv.get_ex(&a, ttl).await));

    tokio::time::sleep(PAST_ONE_SECOND).await;

    out.push(outcome(kv.get(&b).await));
    out.push(outcome(kv.exists(&b).await));
    out.push(outcome(kv.delete(&b).await));
    out
}
