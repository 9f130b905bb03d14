use hugeenum::{Strategy, REGISTRY};
use serde::Serialize;

use crate::{
    app::GlobalOptions,
    output::{print_output, print_table, table, Align},
};

#[derive(Debug, Serialize)]
pub struct StrategyRow {
    pub id: &'static str,
    pub default_elements: usize,
    pub max_elements: usize,
    pub is_default: bool,
    pub description: &'static str,
}

pub fn run(opts: &GlobalOptions) -> anyhow::Result<()> {
    let rows: Vec<StrategyRow> = REGISTRY
        .iter()
        .map(|info| StrategyRow {
            id: info.id,
            default_elements: info.default_elements,
            max_elements: info.max_elements,
            is_default: info.strategy == Strategy::default(),
            description: info.description,
        })
        .collect();

    print_output(&rows, opts, |rows| {
        let mut t = table(&[
            ("Algorithm", Align::Left),
            ("Default", Align::Right),
            ("Max", Align::Right),
            ("Description", Align::Left),
        ]);
        for row in rows {
            let id = if row.is_default {
                format!("{} *", row.id)
            } else {
                row.id.to_string()
            };
            t.add_row(vec![
                id,
                row.default_elements.to_string(),
                row.max_elements.to_string(),
                row.description.to_string(),
            ]);
        }
        print_table(&t, "");
        println!("\n* default algorithm");
    })
}
