//! H.264 profile identifiers.
//!
//! Components report `CodecProfileLevel.profile` as an OMX AVC profile
//! bitmask; streams carry `profile_idc`.

/// `profile_idc` of Baseline.
pub const PROFILE_BASELINE: u32 = 66;
/// `profile_idc` of Main.
pub const PROFILE_MAIN: u32 = 77;
/// `profile_idc` of Extended.
pub const PROFILE_EXTENDED: u32 = 88;
/// `profile_idc` of High.
pub const PROFILE_HIGH: u32 = 100;
/// `profile_idc` of High 10.
pub const PROFILE_HIGH_10: u32 = 110;
/// `profile_idc` of High 4:2:2.
pub const PROFILE_HIGH_422: u32 = 122;
/// `profile_idc` of High 4:4:4.
pub const PROFILE_HIGH_444: u32 = 244;

const OMX_AVC_PROFILES: &[(i32, u32)] = &[
    (0x01, PROFILE_BASELINE),
    (0x02, PROFILE_MAIN),
    (0x04, PROFILE_EXTENDED),
    (0x08, PROFILE_HIGH),
    (0x10, PROFILE_HIGH_10),
    (0x20, PROFILE_HIGH_422),
    (0x40, PROFILE_HIGH_444),
];

/// Map an `OMX_VIDEO_AVCPROFILETYPE` value to `profile_idc`.
#[must_use]
pub fn omx_to_profile_idc(omx_profile: i32) -> Option<u32> {
    OMX_AVC_PROFILES
        .iter()
        .find(|(omx, _)| *omx == omx_profile)
        .map(|&(_, idc)| idc)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_profiles() {
        assert_eq!(omx_to_profile_idc(0x01), Some(PROFILE_BASELINE));
        assert_eq!(omx_to_profile_idc(0x08), Some(PROFILE_HIGH));
        assert_eq!(omx_to_profile_idc(0x40), Some(PROFILE_HIGH_444));
    }

    #[test]
    fn unknown_profiles() {
        assert_eq!(omx_to_profile_idc(0), None);
        assert_eq!(omx_to_profile_idc(0x03), None);
        assert_eq!(omx_to_profile_idc(0x7F00_0000), None);
    }
}
