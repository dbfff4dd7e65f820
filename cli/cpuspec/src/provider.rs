//! Linux host-info provider.
//!
//! Reads the first processor entry of `/proc/cpuinfo` and hands the engine
//! the raw field map it expects (`vendor`, `family`, `features`,
//! `platform`). Tokens are passed through verbatim; canonicalization is the
//! normalizer's job.

use std::collections::BTreeMap;

use anyhow::{bail, Context, Result};
use cpuspec_core::HostProfile;

const CPUINFO: &str = "/proc/cpuinfo";

/// Parse the first processor block of `/proc/cpuinfo` text into a key/value map.
pub fn parse_cpuinfo(text: &str) -> BTreeMap<String, String> {
    let mut info = BTreeMap::new();
    for line in text.lines() {
        if line.trim().is_empty() {
            // A blank line separates processors; only the first one is read.
            if !info.is_empty() {
                break;
            }
            continue;
        }
        let (key, value) = match line.split_once(':') {
            Some((k, v)) => (k.trim(), v.trim()),
            None => (line.trim(), ""),
        };
        info.insert(key.to_string(), value.to_string());
    }
    info
}

/// The instruction-set platform this binary was built for, in catalog terms.
pub fn host_platform() -> &'static str {
    match std::env::consts::ARCH {
        "powerpc64" if cfg!(target_endian = "little") => "ppc64le",
        "powerpc64" => "ppc64",
        "powerpc" => "ppc",
        "x86" => "x86",
        other => other,
    }
}

/// Map a cpuinfo block to the raw field map for `platform`.
///
/// The x86 `cpu family` number is not a vendor family, so no `family` field
/// is produced; alias families then match on the platform alone.
pub fn raw_fields(info: &BTreeMap<String, String>, platform: &str) -> BTreeMap<String, String> {
    let get = |key: &str| info.get(key).cloned().unwrap_or_default();
    let mut fields = BTreeMap::new();
    match platform {
        "x86_64" | "x86" => {
            fields.insert("vendor".to_string(), get("vendor_id"));
            fields.insert("features".to_string(), get("flags"));
        }
        "aarch64" | "arm" => {
            fields.insert("vendor".to_string(), get("CPU implementer"));
            fields.insert("features".to_string(), get("Features"));
        }
        "ppc64" | "ppc64le" => {
            fields.insert("vendor".to_string(), "IBM".to_string());
        }
        _ => {
            fields.insert("vendor".to_string(), get("vendor_id"));
            fields.insert("features".to_string(), get("flags"));
        }
    }
    fields.insert("platform".to_string(), platform.to_string());
    fields
}

/// Build a host profile from cpuinfo text.
pub fn profile_from_cpuinfo(text: &str, platform: &str) -> HostProfile {
    let info = parse_cpuinfo(text);
    HostProfile::from_fields(&raw_fields(&info, platform))
}

/// Detect the profile of the machine this process runs on.
pub fn detect() -> Result<HostProfile> {
    if !cfg!(target_os = "linux") {
        bail!(
            "host detection is only supported on Linux (this is {})",
            std::env::consts::OS
        );
    }
    let text = std::fs::read_to_string(CPUINFO).with_context(|| format!("reading {CPUINFO}"))?;
    let platform = host_platform();
    log::debug!("detecting host on platform '{platform}'");
    Ok(profile_from_cpuinfo(&text, platform))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) const INTEL_CPUINFO: &str = "\
processor\t: 0
vendor_id\t: GenuineIntel
cpu family\t: 6
model\t\t: 94
model name\t: Intel(R) Core(TM) i7-6700 CPU @ 3.40GHz
flags\t\t: fpu vme de pse tsc msr pae mce cx8 apic sep mtrr pge mca cmov pat pse36 clflush mmx fxsr sse sse2 ss ht tm pbe syscall nx pdpe1gb rdtscp lm constant_tsc pni pclmulqdq dtes64 monitor ds_cpl vmx est tm2 ssse3 sdbg fma cx16 xtpr pdcm pcid sse4_1 sse4_2 x2apic movbe popcnt aes xsave avx f16c rdrand lahf_lm abm 3dnowprefetch fsgsbase bmi1 hle avx2 smep bmi2 erms invpcid rtm mpx rdseed adx smap clflushopt xsaveopt xsavec xgetbv1 xsaves
bugs\t\t: cpu_meltdown

processor\t: 1
vendor_id\t: GenuineIntel
flags\t\t: fpu
";

    const GRAVITON2_CPUINFO: &str = "\
processor\t: 0
BogoMIPS\t: 243.75
Features\t: fp asimd evtstrm aes pmull sha1 sha2 crc32 atomics fphp asimdhp cpuid asimdrdm lrcpc dcpop asimddp ssbs
CPU implementer\t: 0x41
CPU architecture: 8
CPU variant\t: 0x3
CPU part\t: 0xd0c
";

    #[test]
    fn reads_only_first_processor() {
        let info = parse_cpuinfo(INTEL_CPUINFO);
        assert_eq!(info.get("processor").map(String::as_str), Some("0"));
        assert!(info["flags"].contains("avx2"));
        assert!(info.contains_key("bugs"));
    }

    #[test]
    fn lines_without_separator_get_empty_value() {
        let info = parse_cpuinfo("processor : 0\nweird line\n");
        assert_eq!(info.get("weird line").map(String::as_str), Some(""));
    }

    #[test]
    fn x86_profile() {
        let profile = profile_from_cpuinfo(INTEL_CPUINFO, "x86_64");
        assert_eq!(profile.vendor.as_deref(), Some("GenuineIntel"));
        assert!(profile.family.is_none());
        assert!(profile.features.contains("avx2"));
        assert_eq!(profile.platform, "x86_64");
    }

    #[test]
    fn aarch64_profile() {
        let profile = profile_from_cpuinfo(GRAVITON2_CPUINFO, "aarch64");
        assert_eq!(profile.vendor.as_deref(), Some("0x41"));
        assert!(profile.features.contains("asimddp"));
    }

    #[test]
    fn power_profile_has_fixed_vendor() {
        let profile = profile_from_cpuinfo("processor : 0\ncpu : POWER9\n", "ppc64le");
        assert_eq!(profile.vendor.as_deref(), Some("IBM"));
        assert!(profile.features.is_empty());
    }

    #[test]
    fn resolves_fixture_hosts() {
        let catalog = cpuspec_core::Catalog::builtin().unwrap();
        let options = cpuspec_core::NormalizeOptions::default();

        let intel = profile_from_cpuinfo(INTEL_CPUINFO, "x86_64");
        let resolution = cpuspec_core::resolve_host(&intel, &catalog, &options).unwrap();
        assert_eq!(resolution.name(), "skylake");

        let graviton = profile_from_cpuinfo(GRAVITON2_CPUINFO, "aarch64");
        let resolution = cpuspec_core::resolve_host(&graviton, &catalog, &options).unwrap();
        assert_eq!(resolution.name(), "graviton2");
    }
}
