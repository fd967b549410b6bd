//! Startup banner.

const BANNER: &str = r"
  _____ _                     _
 |_   _| |__  _   _ _ __   __| | ___ _ __
   | | | '_ \| | | | '_ \ / _` |/ _ \ '__|
   | | | | | | |_| | | | | (_| |  __/ |
   |_| |_| |_|\__,_|_| |_|\__,_|\___|_|
";

/// The banner printed at server startup when `print_banner` is set.
pub fn banner_string() -> String {
    format!("{BANNER}Thunder :: Version:\t{}\n", env!("CARGO_PKG_VERSION"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn banner_names_the_version() {
        assert!(banner_string().contains(env!("CARGO_PKG_VERSION")));
    }
}
