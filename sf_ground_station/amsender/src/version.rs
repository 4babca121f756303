use std::fmt;

/// Version and build stamp printed by -V
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildInfo {
    pub name: &'static str,
    pub major: &'static str,
    pub minor: &'static str,
    pub patch: &'static str,
    pub build_date: &'static str,
    pub build_distro: &'static str,
}

pub const BUILD_INFO: BuildInfo = BuildInfo {
    name: env!("CARGO_PKG_NAME"),
    major: env!("CARGO_PKG_VERSION_MAJOR"),
    minor: env!("CARGO_PKG_VERSION_MINOR"),
    patch: env!("CARGO_PKG_VERSION_PATCH"),
    build_date: env!("AMSENDER_BUILD_DATE"),
    build_distro: env!("AMSENDER_BUILD_DISTRO"),
};

impl fmt::Display for BuildInfo {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} {}.{}.{} ({} {})",
            self.name, self.major, self.minor, self.patch, self.build_date, self.build_distro
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_line_format() {
        let info = BuildInfo {
            name: "amsender",
            major: "1",
            minor: "2",
            patch: "3",
            build_date: "2024-05-01_12:00:00",
            build_distro: "debian",
        };
        assert_eq!(info.to_string(), "amsender 1.2.3 (2024-05-01_12:00:00 debian)");
    }

    #[test]
    fn build_info_is_stamped() {
        let line = BUILD_INFO.to_string();
        assert!(line.starts_with("amsender 0.1.0 ("), "{}", line);
        assert!(line.ends_with(')'));
        assert!(!BUILD_INFO.build_date.is_empty());
        assert!(!BUILD_INFO.build_distro.is_empty());
    }
}
