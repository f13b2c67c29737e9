//! Decoder component selection.

use crate::CodecError;
use crate::platform::PlatformCodecService;
use crate::profile::omx_to_profile_idc;

/// This decoder does not expose its profiles but handles High profile.
const PROFILE_CHECK_EXEMPT: &str = "OMX.LUMEVideoDecoder";

/// Component name prefixes that are never selected.
const DEFAULT_BLACKLIST: &[&str] = &[
    // Software codecs
    "OMX.google.",
    "OMX.ARICENT.",
    "OMX.PV.",
    "OMX.ffmpeg.",
    "AVCDecoder",
    "M2VDecoder",
    "M4vH263Decoder",
    // Known broken hardware codecs
    "OMX.SEC.vc1.dec",
    "OMX.SEC.wmv.dec",
    "OMX.SEC.WMV.Decoder",
    "OMX.SEC.mp3.dec",
    "OMX.SEC.MP3.Decoder",
    "OMX.MTK.VIDEO.DECODER.VC1",
    "OMX.MTK.AUDIO.DECODER.MP3",
    "OMX.Nvidia.mp3.decoder",
    "OMX.Nvidia.mp2.decoder",
    "OMX.Nvidia.h263.decode",
    "OMX.MARVELL.VIDEO.H263DECODER",
    "OMX.MARVELL.AUDIO.MP3DECODER",
    "OMX.TI.DUCATI1.VIDEO.MPEG4D",
    "OMX.qcom.video.decoder.vp8",
    "OMX.ittiam.video.decoder.vp8",
];

/// Component name prefixes excluded from selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blacklist {
    prefixes: Vec<String>,
}

impl Default for Blacklist {
    fn default() -> Self {
        Self::new(DEFAULT_BLACKLIST.iter().copied())
    }
}

impl Blacklist {
    /// Blacklist made of `prefixes`.
    pub fn new<I, P>(prefixes: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<String>,
    {
        Self {
            prefixes: prefixes.into_iter().map(Into::into).collect(),
        }
    }

    /// A blacklist that rejects nothing.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            prefixes: Vec::new(),
        }
    }

    /// Also reject components starting with `prefix`.
    #[must_use]
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefixes.push(prefix.into());
        self
    }

    /// Whether `name` is rejected.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.prefixes.iter().any(|prefix| name.starts_with(prefix.as_str()))
    }
}

/// Find a decoder for `mime`.
///
/// When `h264_profile` is a non-zero `profile_idc`, the component must also
/// declare that profile. Components are visited in platform order and the
/// first match wins.
///
/// # Errors
///
/// Returns `CodecError::Platform` if enumerating the registry fails.
pub fn decoder_name_for<S>(
    service: &S,
    mime: &str,
    h264_profile: Option<u32>,
    blacklist: &Blacklist,
) -> Result<Option<String>, CodecError>
where
    S: PlatformCodecService + ?Sized,
{
    let h264_profile = h264_profile.filter(|&profile| profile != 0);
    let count = service.codec_count()?;

    for index in 0..count {
        let info = service.codec_info_at(index)?;
        if blacklist.contains(&info.name) || info.is_encoder {
            continue;
        }
        if !info.supported_types.iter().any(|t| t == mime) {
            continue;
        }

        let matches = match h264_profile {
            None => true,
            Some(_) if info.name.starts_with(PROFILE_CHECK_EXEMPT) => true,
            Some(wanted) => match service.profile_levels(index, mime) {
                Ok(levels) => {
                    log::debug!("Number of profile levels: {}", levels.len());
                    // Levels are ignored: some components report them too
                    // high.
                    levels
                        .iter()
                        .any(|&omx| omx_to_profile_idc(omx) == Some(wanted))
                }
                Err(e) => {
                    log::warn!("{e}");
                    false
                }
            },
        };

        if matches {
            log::debug!("using {}", info.name);
            return Ok(Some(info.name));
        }
    }

    Ok(None)
}
