pub mod cli;
pub mod job_config;
pub mod mapping_store;

pub use job_config::JobConfig;
pub use mapping_store::JsonMappingStore;

#[cfg(feature = "cli")]
use clap::Parser;

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Parser)]
#[command(name = "json-mapping-etl")]
#[command(about = "Map nested JSON payloads into flat, typed records")]
pub struct CliConfig {
    /// TOML job file
    #[arg(long, short = 'c')]
    pub config: String,

    /// Input JSON file, replaces source.path and switches to a file source
    #[arg(long)]
    pub input: Option<String>,

    #[arg(long)]
    pub mapping_key: Option<String>,

    #[arg(long)]
    pub output_path: Option<String>,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Emit logs as JSON lines")]
    pub json_logs: bool,

    #[arg(long, help = "Transform and report without writing outputs")]
    pub dry_run: bool,
}

#[cfg(feature = "cli")]
impl CliConfig {
    /// 命令列參數優先於 job 檔
    pub fn apply_overrides(&self, job: &mut JobConfig) {
        if let Some(input) = &self.input {
            job.source.r#type = "file".to_string();
            job.source.path = Some(input.clone());
        }
        if let Some(key) = &self.mapping_key {
            job.mapping.mapping_key = Some(key.clone());
        }
        if let Some(output_path) = &self.output_path {
            job.load.output_path = output_path.clone();
        }
    }
}

#[cfg(all(test, feature = "cli"))]
mod tests {
    use super::*;

    #[test]
    fn test_cli_overrides_job_file() {
        let mut job = JobConfig::from_toml_str(
            r#"
[job]
name = "feed"

[source]
type = "api"
endpoint = "https://api.example.com/feed"

[mapping]
config_file = "mappings.json"
mapping_key = "feed"

[load]
output_path = "./output"
output_formats = ["json"]
"#,
        )
        .unwrap();

        let cli = CliConfig::parse_from([
            "json-mapping-etl",
            "--config",
            "job.toml",
            "--input",
            "local.json",
            "--mapping-key",
            "feed_v2",
        ]);
        cli.apply_overrides(&mut job);

        assert_eq!(job.source.r#type, "file");
        assert_eq!(job.source.path.as_deref(), Some("local.json"));
        assert_eq!(job.mapping.mapping_key.as_deref(), Some("feed_v2"));
        assert_eq!(job.load.output_path, "./output");
    }
}
