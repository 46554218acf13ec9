//! A host keeping one horse in a stable.
//!
//! Walks a horse through the life of a script object: built by a factory,
//! copied into a herd, passed by value, stabled, fetched back and finally
//! released. Run with `RUST_LOG=trace` to see every count change.
//!
//! ```bash
//! RUST_LOG=debug cargo run --example stable
//! ```

use angelscript_rco::prelude::*;
use angelscript_rco::{EngineProperties, RcoResult};
use log::info;

struct Horse {
    name: String,
}

impl Counted for Horse {
    fn type_name() -> &'static str {
        "Horse"
    }
}

impl Drop for Horse {
    fn drop(&mut self) {
        info!("{} leaves for greener pastures", self.name);
    }
}

fn register(engine: &Engine) -> RcoResult<()> {
    engine
        .register_object_type::<Horse>()
        .factory("Horse@ f(const string &in)", FactoryContract::Transfers, |engine, args| {
            let name = args.first().and_then(Dynamic::as_str).unwrap_or("nameless");
            Ok(engine
                .create(Horse {
                    name: name.to_string(),
                })?
                .into_raw())
        })
        .build()?;
    engine.register_handle_type()?;
    Ok(())
}

fn new_horse(engine: &Engine, name: &str) -> RcoResult<TypedPtr<Horse>> {
    let owned = engine.call_factory("Horse", &[Dynamic::String(name.to_string())])?;
    let type_name = owned.type_info().name.clone();
    TypedPtr::try_from(owned).map_err(|_| {
        RuntimeError::FactoryFailed {
            type_name,
            reason: "factory did not build a Horse".to_string(),
        }
        .into()
    })
}

fn report(engine: &Engine, step: &str, horse: &TypedPtr<Horse>) {
    let count = horse.object_ref().and_then(|obj| engine.ref_count(obj));
    info!("{step}: refcount={count:?}");
}

fn pass_through(horse: TypedPtr<Horse>, engine: &Engine) -> TypedPtr<Horse> {
    report(engine, "inside pass_through", &horse);
    horse
}

fn main() -> RcoResult<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let engine = Engine::with_properties(
        EngineProperties::new().with(EngineProperty::TraceRefCounts, 1),
    );
    register(&engine)?;

    let mut stable: Slot<Horse> = Slot::new();

    let mut horse = new_horse(&engine, "Artax")?;
    report(&engine, "built", &horse);

    let mut herd = vec![horse.clone()];
    report(&engine, "in herd", &horse);
    herd.pop();
    report(&engine, "out of herd", &horse);

    horse = pass_through(horse.clone(), &engine);
    report(&engine, "after pass_through", &horse);

    let name = horse.name.clone();
    info!("stabling {name}: {:?}", stable.put(horse));

    let intruder = new_horse(&engine, "Epona")?;
    info!("stabling Epona: {:?}", stable.put(intruder));

    let ctx = engine.prepare_context()?;
    let fetched = stable.fetch_handle();
    info!(
        "stable holds {:?}; handle equals itself: {}",
        fetched.object_ref(),
        fetched.equals_dynamic(&Dynamic::Handle(fetched.clone()))
    );
    drop(ctx);
    drop(fetched);

    info!("clearing the stable");
    stable.clear();
    info!("live objects: {}", engine.live_objects());
    Ok(())
}
