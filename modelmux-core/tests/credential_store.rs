use modelmux_core::credentials::{CredentialStore, SecretCipher, StoreOutcome, derive_key};
use std::fs;
use tempfile::TempDir;

const MACHINE: &str = "integration-test-machine";
const SECRET: &str = "sk-ant-REDACTED";

fn stored_value(store: &CredentialStore, id: &str) -> String {
    let raw = fs::read_to_string(store.secrets_path()).unwrap();
    let map: serde_json::Map<String, serde_json::Value> = serde_json::from_str(&raw).unwrap();
    map[id].as_str().unwrap().to_string()
}

#[test]
fn encrypted_secrets_survive_reopen_and_never_hit_disk_in_clear() {
    let dir = TempDir::new().unwrap();
    let store = CredentialStore::open_with_machine_id(dir.path(), MACHINE);
    assert!(store.is_encrypted());
    assert_eq!(store.store("MyClaude", SECRET).unwrap(), StoreOutcome::Encrypted);

    let on_disk = stored_value(&store, "MyClaude");
    assert_ne!(on_disk, SECRET);
    assert!(!fs::read_to_string(store.secrets_path()).unwrap().contains(SECRET));

    let reopened = CredentialStore::open_with_machine_id(dir.path(), MACHINE);
    assert_eq!(reopened.retrieve("MyClaude").unwrap().as_deref(), Some(SECRET));
}

#[test]
fn same_secret_encrypts_differently_each_time() {
    let dir = TempDir::new().unwrap();
    let store = CredentialStore::open_with_machine_id(dir.path(), MACHINE);
    store.store("a", SECRET).unwrap();
    store.store("b", SECRET).unwrap();
    assert_ne!(stored_value(&store, "a"), stored_value(&store, "b"));
}

#[test]
fn other_machine_sees_ciphertext_as_legacy_value() {
    let dir = TempDir::new().unwrap();
    let store = CredentialStore::open_with_machine_id(dir.path(), MACHINE);
    store.store("MyClaude", SECRET).unwrap();
    let ciphertext = stored_value(&store, "MyClaude");

    let foreign = CredentialStore::open_with_machine_id(dir.path(), "another-machine");
    assert_eq!(foreign.retrieve("MyClaude").unwrap(), Some(ciphertext));
}

#[test]
fn plaintext_store_round_trips_and_upgrades_cleanly() {
    let dir = TempDir::new().unwrap();
    let plain = CredentialStore::plaintext(dir.path());
    assert_eq!(plain.store("Legacy", SECRET).unwrap(), StoreOutcome::Plaintext);
    assert_eq!(stored_value(&plain, "Legacy"), SECRET);

    // Enabling encryption later must not lose older plaintext entries
    let encrypted = CredentialStore::open_with_machine_id(dir.path(), MACHINE);
    assert_eq!(encrypted.retrieve("Legacy").unwrap().as_deref(), Some(SECRET));

    encrypted.store("Legacy", SECRET).unwrap();
    assert_ne!(stored_value(&encrypted, "Legacy"), SECRET);
    assert_eq!(encrypted.retrieve("Legacy").unwrap().as_deref(), Some(SECRET));
}

#[test]
fn delete_and_listing() {
    let dir = TempDir::new().unwrap();
    let store = CredentialStore::open_with_machine_id(dir.path(), MACHINE);
    store.store("b", SECRET).unwrap();
    store.store("a", SECRET).unwrap();
    assert_eq!(store.ids().unwrap(), vec!["a", "b"]);

    assert!(store.delete("a").unwrap());
    assert!(!store.delete("a").unwrap());
    assert!(!store.contains("a").unwrap());
    assert_eq!(store.retrieve("a").unwrap(), None);
    assert!(store.contains("b").unwrap());
}

#[test]
fn cipher_built_from_derived_key_reads_store_values() {
    let dir = TempDir::new().unwrap();
    let store = CredentialStore::open_with_machine_id(dir.path(), MACHINE);
    store.store("MyClaude", SECRET).unwrap();

    let salt = fs::read(dir.path().join("credentials.salt")).unwrap();
    assert_eq!(salt.len(), 16);
    let key = derive_key(MACHINE.as_bytes(), &salt).unwrap();
    let cipher = SecretCipher::from_key(&key).unwrap();
    assert_eq!(cipher.decrypt(&stored_value(&store, "MyClaude")).unwrap(), SECRET);
}
