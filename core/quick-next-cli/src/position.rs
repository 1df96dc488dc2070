//! `quick-next position`: inspect or edit the persisted control position.

use std::path::PathBuf;

use quick_next_core::{Position, PositionStore, QuickNextConfig, StorageProvider};
use serde_json::json;

use crate::print_json;

pub enum Action {
    Show,
    Reset,
    Set { left: f64, top: f64 },
}

pub fn run(action: Action, storage: Option<PathBuf>, config: &QuickNextConfig) -> Result<(), String> {
    let provider = StorageProvider::select(storage);
    let backend = describe(&provider);
    let store = PositionStore::new(
        provider.open(),
        config.storage_key.clone(),
        config.default_position(),
    );

    let position = match action {
        Action::Show => store.load(),
        Action::Reset => store.reset()?,
        Action::Set { left, top } => {
            if !left.is_finite() || !top.is_finite() || left < 0.0 || top < 0.0 {
                return Err("Position must be finite and non-negative".to_string());
            }
            let position = Position::absolute(left, top);
            store.save(&position)?;
            position
        }
    };

    print_json(&json!({ "storage": backend, "position": position }))
}

fn describe(provider: &StorageProvider) -> String {
    match provider {
        StorageProvider::Memory => "memory".to_string(),
        StorageProvider::File(path) => path.display().to_string(),
        StorageProvider::Unavailable => "unavailable".to_string(),
    }
}
