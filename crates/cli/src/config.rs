//! Toolchain configuration shared by every module pass.

use clap::Args;

/// Configuration handed to `cc_library` and `cc_binary` modules.
#[derive(Debug, Clone, PartialEq, Eq, Args)]
pub struct BuildConfig {
  /// C compiler used for compiling and linking
  #[arg(long, default_value = "cc")]
  pub cc: String,

  /// Archiver used for static libraries
  #[arg(long, default_value = "ar")]
  pub ar: String,

  /// Flags added to every compile command
  #[arg(long, default_value = "", allow_hyphen_values = true)]
  pub cflags: String,

  /// Directory build outputs are written to, relative to the build directory
  #[arg(long, default_value = "out")]
  pub out_dir: String,
}

impl Default for BuildConfig {
  fn default() -> Self {
    Self {
      cc: "cc".to_string(),
      ar: "ar".to_string(),
      cflags: String::new(),
      out_dir: "out".to_string(),
    }
  }
}

impl BuildConfig {
  pub fn with_cc(mut self, cc: &str) -> Self {
    self.cc = cc.to_string();
    self
  }

  pub fn with_cflags(mut self, cflags: &str) -> Self {
    self.cflags = cflags.to_string();
    self
  }

  pub fn with_out_dir(mut self, out_dir: &str) -> Self {
    self.out_dir = out_dir.to_string();
    self
  }

  /// The flags needed to reproduce this configuration on the command line.
  pub fn to_args(&self) -> Vec<String> {
    let defaults = Self::default();
    let mut args = Vec::new();
    for (flag, value, default) in [
      ("--cc", &self.cc, &defaults.cc),
      ("--ar", &self.ar, &defaults.ar),
      ("--cflags", &self.cflags, &defaults.cflags),
      ("--out-dir", &self.out_dir, &defaults.out_dir),
    ] {
      if value != default {
        args.push(format!("{}={}", flag, value));
      }
    }
    args
  }
}
