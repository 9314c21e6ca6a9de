use anyhow::Context;
use slippymap::{LatLng, MapBuilder, MapOptions};

/// Renders one frame around Sousse without any UI and writes it to a PNG.
///
/// Usage: `cargo run --example headless [output.png] [options.json]`
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let output = args.next().unwrap_or_else(|| "sousse.png".to_string());
    let options = match args.next() {
        Some(path) => MapOptions::from_json_file(&path)
            .with_context(|| format!("loading options from {}", path))?,
        None => MapOptions::default(),
    };

    println!("🗺️ slippymap headless example");
    println!("   Tiles: {}", options.tile_source);
    println!(
        "   Attribution: {} ({})",
        options.attribution.label, options.attribution.url
    );

    let sousse = LatLng::new(35.83, 10.64);
    let mut map = MapBuilder::new()
        .with_options(options)
        .with_center_and_zoom(sousse, 12)
        .build()?;
    let redraws = map.redraw_events();

    let viewport = map.viewport();
    println!(
        "   Zoom {} centered on tile {:?}",
        viewport.zoom(),
        viewport.center_tile()
    );

    let report = map.draw(800, 600, 1.0).await;
    println!(
        "✅ Painted {}/{} tiles",
        report.painted, report.planned
    );
    for (coord, error) in &report.failures {
        println!("   ⚠️ {}: {}", coord, error);
    }

    // A nudge east and a second frame; the overlapping tiles come from cache.
    map.pan_east();
    map.pan_east();
    if let Ok(request) = redraws.try_recv() {
        println!("   Redraw requested at offset {:?}", request.offset);
    }
    let report = map.draw(800, 600, 2.0).await;
    println!(
        "✅ Second frame at 2x: {}/{} tiles, cache {:?}",
        report.painted,
        report.planned,
        map.cache_stats()
    );

    map.save_raster(&output)
        .with_context(|| format!("writing {}", output))?;
    println!("💾 Saved {}", output);
    Ok(())
}
