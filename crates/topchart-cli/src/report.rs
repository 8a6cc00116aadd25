//! Console report printed after a successful save. Presentation only.

use std::time::Duration;
use topchart_core::{ResultSet, MAX_ITEMS};
use topchart_local::export::{preview_table, SaveSummary};

const RULE_WIDTH: usize = 80;

fn rule() -> String {
    "=".repeat(RULE_WIDTH)
}

pub fn banner(headless: bool, url: &str) {
    println!("IMDb TOP {MAX_ITEMS} SCRAPER");
    println!("{}", "=".repeat(50));
    if headless {
        println!("Chrome will run in headless mode");
    } else {
        println!("Chrome will run in a visible window");
    }
    println!("Source: {url}");
    println!("This may take 20-30 seconds...");
    println!("{}", "=".repeat(50));
}

pub fn saved(summary: &SaveSummary, set: &ResultSet) {
    println!("Data saved to {}", summary.path.display());
    println!("Total movies: {}", summary.total);
    println!(
        "Movies with proper titles: {}/{MAX_ITEMS}",
        summary.proper_titles
    );
    println!(
        "Movies with proper years: {}/{MAX_ITEMS}",
        summary.proper_years
    );

    let records = set.records();
    println!("\n{}\nFIRST 10 MOVIES:\n{}", rule(), rule());
    print!("{}", preview_table(&records[..records.len().min(10)]));

    if records.len() >= 20 {
        let end = records.len().min(109);
        println!("\n{}\nSAMPLE MOVIES 100-110:\n{}", rule(), rule());
        print!("{}", preview_table(&records[99.min(end)..end]));
    }
}

pub fn final_stats(summary: &SaveSummary, elapsed: Duration) {
    let secs = elapsed.as_secs_f64();
    println!("\nSUCCESS! Scraping completed in {secs:.2} seconds");
    println!("Output file: {}", summary.path.display());
    println!("\nFINAL STATISTICS:");
    println!(
        "   - Total movies extracted: {}/{MAX_ITEMS}",
        summary.total
    );
    println!(
        "   - Movies with proper titles: {}/{MAX_ITEMS}",
        summary.proper_titles
    );
    println!(
        "   - Movies with proper years: {}/{MAX_ITEMS}",
        summary.proper_years
    );
    println!("   - Execution time: {secs:.2} seconds");
    if summary.proper_titles >= MAX_ITEMS {
        println!("   ALL {MAX_ITEMS} movie titles extracted successfully!");
    } else {
        println!(
            "   {} movie titles may be missing",
            MAX_ITEMS.saturating_sub(summary.proper_titles)
        );
    }
}
