use std::{io::Write, sync::Arc};

use crate::catalog::{CatalogError, CollectionStore};
use crate::data_types::{ActorContext, CollectionInput};

#[derive(Debug, thiserror::Error)]
pub enum OneOffError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error("Error writing the result: {0}")]
    Output(#[from] serde_json::Error),
}

// Create a single collection from its JSON definition and write the stored
// result to a writer
pub async fn run_one_off_command<W>(
    store: Arc<dyn CollectionStore>,
    definition: &str,
    mut output: W,
) -> Result<(), OneOffError>
where
    W: Write,
{
    let input: CollectionInput =
        serde_json::from_str(definition).map_err(|e| CatalogError::InvalidDefinition {
            reason: format!("malformed definition: {e}"),
        })?;

    let summary = store.create(&input, &ActorContext::anonymous()).await?;

    serde_json::to_writer(&mut output, &summary)?;
    // Newline-terminated, one summary per line
    writeln!(output).map_err(serde_json::Error::io)?;
    Ok(())
}
