use std::path::PathBuf;

use clap::{Parser, Subcommand};
use content_core::{ResourceType, Space};

/// Author detection content in draft and promote it through test to standard.
///
/// Every command prints JSON on stdout; logs go to stderr.
#[derive(Parser, Debug)]
#[command(name = "contentctl", about = "Author and promote detection content between spaces")]
pub struct CliArgs {
    /// Content store directory (overrides DATA_DIR)
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Configuration profile (overrides CONTENT_PROFILE)
    #[arg(long, global = true)]
    pub profile: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the content digest of a JSON document (`-` reads stdin)
    Hash { file: PathBuf },

    /// Create a resource in the draft space
    Create {
        /// policy, integrations, rules, kvdbs, decoders or filters
        resource_type: ResourceType,
        file: PathBuf,
    },

    /// Apply a JSON array of patch operations to a draft resource
    Patch {
        resource_type: ResourceType,
        id: String,
        ops_file: PathBuf,
    },

    /// Delete a draft resource
    Delete { resource_type: ResourceType, id: String },

    /// Show the changes promoting a space would apply to the next one
    Preview { space: Space },

    /// Promote a space into the next one
    Promote {
        space: Space,

        /// Changeset to apply (a preview or request document); defaults to the full preview
        #[arg(long)]
        changes: Option<PathBuf>,
    },

    /// Record counts and digests per space
    Status {
        /// Limit to one space
        #[arg(long)]
        space: Option<Space>,
    },

    /// Print the effective configuration
    Config,
}
