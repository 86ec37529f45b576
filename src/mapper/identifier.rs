use uuid::Uuid;

/// Namespace every image-set identifier is derived under. Changing it changes
/// every published image-set UUID.
pub const IMAGE_SET_NAMESPACE: Uuid = Uuid::from_u128(0x2a3f6b0e_5d1c_4c8e_9f4a_7b1d2e3c4f50);

/// Name-based (v3) UUID for an opaque CMS image-set id.
pub fn derive(opaque_id: &str) -> Uuid {
    Uuid::new_v3(&IMAGE_SET_NAMESPACE, opaque_id.as_bytes())
}
