use crate::error::SqlMutationError;
use crate::executor::MutationExecutor;
use crate::link::CallContext;
use crate::results::MutationResult;
use crate::statement::Rendered;

use super::MutationBuilder;

impl MutationBuilder<'_> {
    /// Execute the mutation once.
    ///
    /// # Errors
    /// Returns `ParameterError` for builder misuse, `NotSupported` for explicit returning
    /// requests the dialect cannot honour, and any error from the resolved link.
    pub async fn execute(self, ctx: &CallContext) -> Result<MutationResult, SqlMutationError> {
        if let Some(misuse) = self.misuse {
            return Err(SqlMutationError::ParameterError(misuse));
        }
        MutationExecutor::new(self.source)
            .execute(ctx, self.link, &self.mutation, &self.options)
            .await
    }

    /// Render the statement without a returning clause, for logging or inspection.
    ///
    /// # Errors
    /// Returns the same rendering errors `execute` would.
    pub fn to_sql(&self) -> Result<Rendered, SqlMutationError> {
        if let Some(misuse) = &self.misuse {
            return Err(SqlMutationError::ParameterError(misuse.clone()));
        }
        let dialect = self
            .link
            .as_ref()
            .map_or_else(|| self.source.dialect(), |link| link.dialect());
        self.mutation
            .render(dialect, &self.options.insert_option, None)
    }
}
