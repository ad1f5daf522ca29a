//! Script parameter listing command

use crate::ParamsArgs;
use anyhow::{bail, Result};
use clut_ctl::{ParamDescriptor, ParamType};
use clut_primaries::WorkingSpaces;
use clut_store::{ClutStore, StoreSettings};
use std::sync::Arc;

pub fn run(args: ParamsArgs, settings: StoreSettings) -> Result<()> {
    let store = ClutStore::new(settings, Arc::new(WorkingSpaces::new()));
    super::ensure_file(&store.resolve(&args.script), "Script")?;

    let Some(script) = store.get_script(&args.script) else {
        bail!("Not a valid color script: {} (run with -v for details)", args.script.display());
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&script.params)?);
        return Ok(());
    }

    println!("{}", args.script.display());
    if script.params.is_empty() {
        println!("  (no parameters)");
    }
    for p in &script.params {
        println!("  {}", describe(p));
        if !p.gui_help.is_empty() {
            println!("      {}", p.gui_help);
        }
    }
    Ok(())
}

fn describe(p: &ParamDescriptor) -> String {
    match p.param_type {
        ParamType::Bool => format!("{} \"{}\": bool = {}", p.name, p.gui_name, p.value_default != 0.0),
        ParamType::Int => format!(
            "{} \"{}\": int [{}, {}] = {}",
            p.name, p.gui_name, p.value_min, p.value_max, p.value_default
        ),
        ParamType::Float => format!(
            "{} \"{}\": float [{}, {}] step {} = {}",
            p.name, p.gui_name, p.value_min, p.value_max, p.gui_step, p.value_default
        ),
        ParamType::Choice => format!(
            "{} \"{}\": choice {{{}}} = {}",
            p.name,
            p.gui_name,
            p.choices.join(", "),
            p.choices.get(p.value_default as usize).map(String::as_str).unwrap_or("?")
        ),
    }
}
