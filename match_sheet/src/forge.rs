// ********* Document generation **********

use std::thread;
use std::time::Duration;

use log::{debug, info};
use snafu::prelude::*;

use crate::formula::hyperlink;
use crate::row::MatchRow;
use crate::table::{qualified_range, InputMode, TableClient, Worksheet};
use crate::{LinkSpec, RemoteError, RemoteSnafu, SyncResult};

/// The operations this crate needs from the file storage behind the documents.
pub trait DocumentStore {
    /// Duplicates a file and returns the id of the copy.
    fn copy_file(&self, file_id: &str) -> Result<String, RemoteError>;
    fn rename_file(&self, file_id: &str, name: &str) -> Result<(), RemoteError>;
    /// Moves a file out of its current folders into `folder_id`.
    fn move_file(&self, file_id: &str, folder_id: &str) -> Result<(), RemoteError>;
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Document {
    pub id: String,
    pub title: String,
}

impl Document {
    /// The cell content linking to this document.
    pub fn link(&self, label: &str) -> String {
        hyperlink(&self.id, label)
    }
}

/// Copies templates and fills them from match rows.
///
/// Every write into a generated document waits `pacing` first, to stay under
/// the write quota of the spreadsheet service.
pub struct DocumentForge<'c> {
    store: &'c dyn DocumentStore,
    table: &'c dyn TableClient,
    pacing: Duration,
}

impl<'c> DocumentForge<'c> {
    pub fn new(
        store: &'c dyn DocumentStore,
        table: &'c dyn TableClient,
        pacing: Duration,
    ) -> DocumentForge<'c> {
        DocumentForge {
            store,
            table,
            pacing,
        }
    }

    fn pause(&self) {
        if !self.pacing.is_zero() {
            thread::sleep(self.pacing);
        }
    }

    /// Copy, rename, move. A failure after the copy leaves the copy behind.
    pub fn create_from_template(
        &self,
        template_id: &str,
        title: &str,
        folder_id: &str,
    ) -> SyncResult<Document> {
        let id = self.store.copy_file(template_id).context(RemoteSnafu {
            operation: format!("copying template {}", template_id),
        })?;
        self.store.rename_file(&id, title).context(RemoteSnafu {
            operation: format!("renaming {} to {:?}", id, title),
        })?;
        self.store.move_file(&id, folder_id).context(RemoteSnafu {
            operation: format!("moving {} into folder {}", id, folder_id),
        })?;
        info!("create_from_template: {:?} -> {}", title, id);
        Ok(Document {
            id,
            title: title.to_string(),
        })
    }

    pub fn retitle(&self, doc_id: &str, title: &str) -> SyncResult<()> {
        self.store.rename_file(doc_id, title).context(RemoteSnafu {
            operation: format!("renaming {} to {:?}", doc_id, title),
        })
    }

    /// Writes every link of `links` into the document.
    ///
    /// `slot` is the judge seat or side index, added to the column of
    /// `per_judge` literal links. Rendered links read `matches`.
    pub fn apply_links(
        &self,
        doc_id: &str,
        sheet_title: Option<&str>,
        row: &MatchRow,
        matches: &Worksheet,
        links: &[LinkSpec],
        slot: usize,
    ) -> SyncResult<()> {
        for link in links {
            let dest = qualified_range(sheet_title, link.dest());
            match link {
                LinkSpec::Literal {
                    column, per_judge, ..
                } => {
                    let column = if *per_judge { column + slot } else { *column };
                    let value = row.cell(column);
                    self.write(doc_id, &dest, value, InputMode::Raw)?;
                }
                LinkSpec::Rendered { cell, .. } => {
                    let value = matches.read_cell(cell)?;
                    self.write(doc_id, &dest, value, InputMode::Raw)?;
                }
                LinkSpec::Choice { columns, .. } => {
                    let options: Vec<String> = columns
                        .iter()
                        .map(|c| row.cell(*c))
                        .filter(|v| !v.is_empty())
                        .collect();
                    self.pause();
                    debug!("apply_links: {} {} <- one of {:?}", doc_id, dest, options);
                    self.table
                        .set_choice_validation(doc_id, &dest, &options)
                        .context(RemoteSnafu {
                            operation: format!("setting choices on {} of {}", dest, doc_id),
                        })?;
                }
            }
        }
        Ok(())
    }

    /// Writes a formula into one cell of a generated document.
    pub fn write_formula(
        &self,
        doc_id: &str,
        sheet_title: Option<&str>,
        dest: &str,
        formula: String,
    ) -> SyncResult<()> {
        let dest = qualified_range(sheet_title, dest);
        self.write(doc_id, &dest, formula, InputMode::UserEntered)
    }

    fn write(&self, doc_id: &str, range: &str, value: String, mode: InputMode) -> SyncResult<()> {
        self.pause();
        debug!("write: {} {} <- {:?}", doc_id, range, value);
        self.table
            .write_values(doc_id, range, &[vec![value]], mode)
            .context(RemoteSnafu {
                operation: format!("writing {} of {}", range, doc_id),
            })
    }
}
