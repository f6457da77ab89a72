#![allow(clippy::uninlined_format_args)]

use bloom_backends_rs::{BloomFilter, FilterConfigBuilder, ProbeStrategy};
use comfy_table::{
    Cell, CellAlignment, ContentArrangement, Table,
    modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL,
};

const TEST_SAMPLES: u64 = 10_000;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("Bloom filter - observed vs configured false positive rate\n");

    let capacities = [1_000u64, 10_000, 100_000];
    let target_fprs = [0.01, 0.05, 0.1];
    let strategies = [ProbeStrategy::SeededRng, ProbeStrategy::DoubleHash];

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("Strategy").set_alignment(CellAlignment::Center),
            Cell::new("Capacity").set_alignment(CellAlignment::Center),
            Cell::new("Target FPR").set_alignment(CellAlignment::Center),
            Cell::new("Bits").set_alignment(CellAlignment::Center),
            Cell::new("Probes").set_alignment(CellAlignment::Center),
            Cell::new("Observed FPR").set_alignment(CellAlignment::Center),
            Cell::new("Deviation").set_alignment(CellAlignment::Center),
        ]);

    for strategy in strategies {
        for &capacity in &capacities {
            for &target_fpr in &target_fprs {
                let config = FilterConfigBuilder::default()
                    .capacity(capacity)
                    .error_rate(target_fpr)
                    .strategy(strategy)
                    .build()?;
                let mut filter = BloomFilter::new_in_memory(config)?;

                // fill to designed capacity
                for i in 0..capacity {
                    let item = format!("member_{:08}", i);
                    filter.add(item.as_bytes())?;
                }

                let false_positives = (0..TEST_SAMPLES)
                    .filter(|i| {
                        let item = format!("outsider_{:08}", i);
                        filter.contains(item.as_bytes()).unwrap_or(false)
                    })
                    .count();
                let observed = false_positives as f64 / TEST_SAMPLES as f64;
                let deviation = (observed - target_fpr) / target_fpr * 100.0;

                table.add_row(vec![
                    Cell::new(format!("{:?}", strategy)),
                    Cell::new(capacity.to_string())
                        .set_alignment(CellAlignment::Right),
                    Cell::new(format!("{:.2}%", target_fpr * 100.0))
                        .set_alignment(CellAlignment::Right),
                    Cell::new(filter.bit_count().to_string())
                        .set_alignment(CellAlignment::Right),
                    Cell::new(filter.probe_count().to_string())
                        .set_alignment(CellAlignment::Right),
                    Cell::new(format!("{:.3}%", observed * 100.0))
                        .set_alignment(CellAlignment::Right),
                    Cell::new(format!("{:+.1}%", deviation))
                        .set_alignment(CellAlignment::Right),
                ]);
            }
        }
    }

    println!("{table}");
    Ok(())
}
