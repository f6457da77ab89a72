//! Quick tour of the storage backends over one filter template.

use bloom_backends_rs::{BloomFilter, FilterConfigBuilder, ProbeStrategy};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("debug")),
        )
        .init();

    let config = || {
        FilterConfigBuilder::default()
            .capacity(10_000)
            .error_rate(0.01)
            .strategy(ProbeStrategy::DoubleHash)
            .build()
            .expect("Failed to build config")
    };

    let dir = tempfile::tempdir()?;

    let mut memory = BloomFilter::new_in_memory(config())?;
    memory.add(b"cached page")?;
    println!("memory filter: {:?}", memory);

    let mut mapped =
        BloomFilter::new_mmap(config(), dir.path().join("mapped.bloom"))?;
    mapped.add(b"seen url")?;
    mapped.flush()?;

    let mut seekable = BloomFilter::new_seek_file(
        config(),
        dir.path().join("seekable.bloom"),
    )?;
    seekable.add(b"processed id")?;

    // All three share one template, so cross-backend set algebra works
    let merged = memory.union(&mapped)?.union(&seekable)?;
    for key in [b"cached page".as_slice(), b"seen url", b"processed id"] {
        println!(
            "merged filter contains {:?}: {}",
            String::from_utf8_lossy(key),
            merged.contains(key)?
        );
    }

    #[cfg(feature = "redis")]
    {
        let url = std::env::var("REDIS_URI")
            .unwrap_or_else(|_| "redis://127.0.0.1/".to_string());
        let mut remote = BloomFilter::new_redis(config(), &url, "bloom_demo")?;
        remote.add(b"shared key")?;
        println!(
            "redis filter contains 'shared key': {}",
            remote.contains(b"shared key")?
        );
    }

    Ok(())
}
