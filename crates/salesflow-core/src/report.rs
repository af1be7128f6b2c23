use std::io::{self, Write};

use polars::prelude::DataFrame;
use tracing::warn;

use crate::metrics::TopItem;

const HEAD_ROWS: usize = 5;

/// Operator-facing trace of the run. Output failures are logged and swallowed.
pub struct Reporter<W: Write> {
    out: W,
}

impl<W: Write> Reporter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    pub fn head(&mut self, title: &str, df: &DataFrame) {
        let head = df.head(Some(HEAD_ROWS));
        self.emit(|out| writeln!(out, "{title}:\n{head}\n"));
    }

    pub fn frame(&mut self, title: &str, df: &DataFrame) {
        self.emit(|out| writeln!(out, "{title}:\n{df}\n"));
    }

    pub fn top_item(&mut self, item: Option<&TopItem>) {
        self.emit(|out| match item {
            Some(item) => writeln!(
                out,
                "Producto más vendido:\n{} ({}) - {} unidades\n",
                item.name.as_deref().unwrap_or("sin nombre"),
                item.item_id,
                item.quantity
            ),
            None => writeln!(out, "Producto más vendido:\nsin ventas registradas\n"),
        });
    }

    pub fn line(&mut self, message: &str) {
        self.emit(|out| writeln!(out, "{message}"));
    }

    fn emit(&mut self, write: impl FnOnce(&mut W) -> io::Result<()>) {
        if let Err(err) = write(&mut self.out).and_then(|_| self.out.flush()) {
            warn!(error = %err, "failed to write report output");
        }
    }
}
