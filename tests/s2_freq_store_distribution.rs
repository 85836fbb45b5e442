use std::collections::HashMap;

use anyhow::Result;

use frontier_core::freq_store::FreqStore;
use frontier_core::ids::PageId;

fn pid(b: u8) -> PageId {
    PageId::new(vec![b]).unwrap()
}

/// Over many draws, selection counts track frequency ratios.
#[test]
fn selection_counts_track_frequency_ratios() -> Result<()> {
    let mut s = FreqStore::open(None)?;

    s.add(&pid(0), 1.0, false);
    s.add(&pid(1), 1.0, false);
    s.add(&pid(2), 4.0, false);
    s.add(&pid(3), 8.0, false);
    s.add(&pid(4), 8.0, false);

    s.add(&pid(5), 1.0, false);
    s.set(&pid(5), 8.5);

    s.add(&pid(6), 100.0, false);
    s.delete(&pid(6));

    let mut counts: HashMap<PageId, u32> = HashMap::new();
    for _ in 0..1000 {
        let due = s.get_next_pages(1);
        *counts.entry(due[0].clone()).or_insert(0) += 1;
    }

    let c0 = *counts.get(&pid(0)).unwrap_or(&0) as f64;
    assert!(c0 > 0.0);

    let ratio = |p: u8, expected: f64| {
        let c = *counts.get(&pid(p)).unwrap_or(&0) as f64;
        let got = c / c0;
        assert!(
            (got - expected).abs() / expected < 0.10,
            "page {p}: got ratio {got}, expected ~{expected}"
        );
    };

    ratio(1, 1.0);
    ratio(2, 4.0);
    ratio(3, 8.0);
    ratio(4, 8.0);
    ratio(5, 8.5);

    assert_eq!(*counts.get(&pid(6)).unwrap_or(&0), 0);

    Ok(())
}
