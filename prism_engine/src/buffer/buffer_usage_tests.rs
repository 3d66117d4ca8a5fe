//! Unit tests for buffer enumerations and their translation helpers

use crate::buffer::{
    BindingTarget, BufferAccessMode, BufferUsageHint, MapFlags, TransferDirection,
    UsageFrequency, UsageNature,
};

// ============================================================================
// USAGE HINT
// ============================================================================

#[test]
fn test_usage_hint_default_is_dynamic_draw() {
    assert_eq!(BufferUsageHint::default(), BufferUsageHint::DynamicDraw);
}

#[test]
fn test_usage_hint_decomposition() {
    let cases = [
        (BufferUsageHint::StreamDraw, UsageFrequency::Stream, UsageNature::Draw),
        (BufferUsageHint::StreamRead, UsageFrequency::Stream, UsageNature::Read),
        (BufferUsageHint::StreamCopy, UsageFrequency::Stream, UsageNature::Copy),
        (BufferUsageHint::StaticDraw, UsageFrequency::Static, UsageNature::Draw),
        (BufferUsageHint::StaticRead, UsageFrequency::Static, UsageNature::Read),
        (BufferUsageHint::StaticCopy, UsageFrequency::Static, UsageNature::Copy),
        (BufferUsageHint::DynamicDraw, UsageFrequency::Dynamic, UsageNature::Draw),
        (BufferUsageHint::DynamicRead, UsageFrequency::Dynamic, UsageNature::Read),
        (BufferUsageHint::DynamicCopy, UsageFrequency::Dynamic, UsageNature::Copy),
    ];
    for (hint, frequency, nature) in cases {
        assert_eq!(hint.frequency(), frequency, "{:?}", hint);
        assert_eq!(hint.nature(), nature, "{:?}", hint);
    }
}

// ============================================================================
// ACCESS MODE
// ============================================================================

#[test]
fn test_access_mode_map_flags() {
    assert_eq!(BufferAccessMode::ReadOnly.map_flags(), MapFlags::READ);
    assert_eq!(BufferAccessMode::WriteOnly.map_flags(), MapFlags::WRITE);
    assert_eq!(
        BufferAccessMode::WriteDiscard.map_flags(),
        MapFlags::WRITE | MapFlags::INVALIDATE_BUFFER
    );
    assert_eq!(BufferAccessMode::ReadWrite.map_flags(), MapFlags::READ | MapFlags::WRITE);
}

#[test]
fn test_write_discard_is_a_write_mapping() {
    let flags = BufferAccessMode::WriteDiscard.map_flags();
    assert!(flags.contains(MapFlags::WRITE));
    assert!(!flags.contains(MapFlags::READ));
}

// ============================================================================
// TARGETS AND TRANSFER DIRECTION
// ============================================================================

#[test]
fn test_binding_target_all_is_unique() {
    let mut targets = BindingTarget::ALL.to_vec();
    targets.sort();
    targets.dedup();
    assert_eq!(targets.len(), BindingTarget::ALL.len());
}

#[test]
fn test_transfer_direction_targets_and_usage() {
    assert_eq!(TransferDirection::Upload.binding_target(), BindingTarget::PixelUnpack);
    assert_eq!(TransferDirection::Download.binding_target(), BindingTarget::PixelPack);
    assert_eq!(TransferDirection::Upload.default_usage(), BufferUsageHint::StreamDraw);
    assert_eq!(TransferDirection::Download.default_usage(), BufferUsageHint::StreamRead);
}
