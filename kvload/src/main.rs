//! Command line entry point of the key-value load generator.
#![warn(missing_docs)]
#![warn(missing_debug_implementations)]

fn main() -> anyhow::Result<()> {
    kvload::cli::execute()
}
