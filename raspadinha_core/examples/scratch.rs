use raspadinha_core::{CardEngine, EngineConfig, ProvablyFairRng, ScratchMask};

fn main() {
    // Example end-to-end play of a three-card batch
    let engine = CardEngine::new(EngineConfig::default()).expect("default config is valid");
    let rng = ProvablyFairRng::new("example-server-seed", "example-client-seed", 1);
    let mut batch = engine
        .generate_fair_batch(&rng, 3, 0)
        .expect("batch within limits");

    let surface = *batch.surface();
    for index in 0..batch.len() {
        let mut y = 0.0;
        while !batch.cards()[index].is_revealed() {
            let mask = ScratchMask::stroke([(0.0, y), (surface.width as f64, y)]);
            let out = engine.scratch(&mut batch, index, &mask).expect("valid scratch");
            if let Some(event) = out.event {
                println!(
                    "card {} revealed at {:.0}%: {}",
                    event.card_index,
                    batch.cards()[index].scratched_ratio() * 100.0,
                    event.outcome
                );
            }
            y += surface.brush_radius;
        }
    }

    let settlement = engine.settle(&batch).expect("batch finished");
    println!(
        "server_seed_hash={} wagered={} prize={}",
        rng.server_seed_hash_hex(),
        settlement.total_wagered,
        settlement.total_prize
    );
}
