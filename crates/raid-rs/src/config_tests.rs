use super::*;

#[test]
fn accepts_well_formed_config() {
    let cfg = RaidConfig::new("/tmp/raid", 6, 4, 16).unwrap();
    assert_eq!(cfg.stripe_width(), 8);
    assert_eq!(cfg.stripe_count(), 4);
    assert_eq!(cfg.stripe_size(), 24);
}

#[test]
fn rejects_misaligned_disk_size() {
    let err = RaidConfig::new("/tmp/raid", 6, 4, 17).unwrap_err();
    assert!(matches!(err, RaidError::ConfigInvalid(_)));
}

#[test]
fn rejects_too_few_data_disks() {
    let err = RaidConfig::new("/tmp/raid", 1, 4, 16).unwrap_err();
    assert!(matches!(err, RaidError::ConfigInvalid(_)));
}

#[test]
fn rejects_zero_block_size() {
    let err = RaidConfig::new("/tmp/raid", 6, 0, 16).unwrap_err();
    assert!(matches!(err, RaidError::ConfigInvalid(_)));
}

#[test]
fn rejects_non_two_parity_disks_via_direct_construction() {
    let cfg = RaidConfig {
        data_path: "/tmp/raid".to_string(),
        data_disks: 6,
        parity_disks: 3,
        block_size: 4,
        disk_size: 16,
    };
    assert!(matches!(cfg.validate(), Err(RaidError::ConfigInvalid(_))));
}
