//! Print a manifest stored in a local registry directory
//!
//! Run with: cargo run -p registry --example read_manifest -- /var/lib/registry library/ubuntu latest

use camino::Utf8PathBuf;
use futures::TryStreamExt;
use registry::{ManifestRef, RegistryBuilder, RepositoryName};
use storage::LocalDriver;
use tokio::io::AsyncWriteExt;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let mut args = std::env::args().skip(1);
    let (Some(root), Some(name), Some(reference)) = (args.next(), args.next(), args.next()) else {
        return Err("usage: read_manifest <root> <repository> <tag-or-digest>".into());
    };

    let registry = RegistryBuilder::new()
        .storage(LocalDriver::new(Utf8PathBuf::from(root)).into())
        .build()?;

    let name = RepositoryName::new(&name)?;
    let reference: ManifestRef = reference.parse()?;

    let Some(mut manifest) = registry.get_manifest(&name, &reference).await? else {
        tracing::info!(%name, %reference, "manifest not found");
        return Ok(());
    };

    let mut stdout = tokio::io::stdout();
    while let Some(chunk) = manifest.try_next().await? {
        stdout.write_all(&chunk).await?;
    }
    stdout.flush().await?;

    Ok(())
}
