//! Invalidation wrapper for mutating computations
//!
//! [`Invalidating`] wraps a callable that changes the data a read-side
//! [`crate::cache::Cached`] serves. After the inner callable runs, the
//! cache entry keyed by a chosen subset of its arguments is deleted, so the
//! next read recomputes.
//!
//! The subset is selected *by parameter name* from the callable's bound
//! arguments ([`BoundArgs`]) and then hashed as positional values, the
//! same way the read side hashes a positional call. That is what lets a
//! mutator that only receives an identifier kill the entry a richer read
//! call produced.

use std::future::Future;
use tracing::debug;

use crate::cache::key::{arg_hash, ArgValue, CallArgs, CallableKind};
use crate::error::{CacheError, Result};
use crate::repository::KeyedStore;

/// An argument set that can bind its values to parameter names.
///
/// Implementors list every parameter in declaration order with any
/// defaults already applied, mirroring the callable's signature.
pub trait BoundArgs {
    fn bound_args(&self) -> Result<Vec<(&'static str, ArgValue)>>;
}

/// A mutating callable wrapped with cache invalidation.
///
/// Must share its repository prefix with the read-side wrapper whose
/// entries it invalidates, otherwise the computed keys land in a different
/// namespace.
pub struct Invalidating<S, F> {
    repo: S,
    inner: F,
    kind: CallableKind,
    key_args: Option<Vec<&'static str>>,
}

impl<S, F> Invalidating<S, F> {
    /// Wrap `inner` over `repo`, hashing all bound arguments.
    pub fn new(repo: S, inner: F) -> Self {
        Self {
            repo,
            inner,
            kind: CallableKind::Function,
            key_args: None,
        }
    }

    /// Set the key policy (bound method / response handler).
    pub fn with_kind(mut self, kind: CallableKind) -> Self {
        self.kind = kind;
        self
    }

    /// Restrict hashing to the named parameters, in the given order.
    pub fn with_key_args(mut self, names: impl IntoIterator<Item = &'static str>) -> Self {
        self.key_args = Some(names.into_iter().collect());
        self
    }

    fn select_values<A: BoundArgs>(&self, args: &A) -> Result<Vec<ArgValue>> {
        let bound = args.bound_args()?;

        let mut values: Vec<ArgValue> = match &self.key_args {
            Some(names) => names
                .iter()
                .map(|name| {
                    bound
                        .iter()
                        .find(|(bound_name, _)| bound_name == name)
                        .map(|(_, value)| value.clone())
                        .ok_or_else(|| {
                            CacheError::Config(format!("unknown key argument `{name}`"))
                        })
                })
                .collect::<Result<_>>()?,
            None => bound.into_iter().map(|(_, value)| value).collect(),
        };

        // With an explicit subset, method and response-handler calls drop
        // the leading receiver/caller slot, matching the read-side key.
        // Without key_args every bound value participates.
        if self.key_args.is_some()
            && matches!(
                self.kind,
                CallableKind::Method | CallableKind::ResponseHandler
            )
            && !values.is_empty()
        {
            values.remove(0);
        }

        Ok(values)
    }

    /// Invoke the inner callable, then delete the cache entry keyed by the
    /// selected argument values. Invalidation reflects post-call state.
    pub async fn call<A, R, Fut>(&self, args: A) -> Result<R>
    where
        A: BoundArgs,
        F: Fn(A) -> Fut,
        Fut: Future<Output = Result<R>>,
        S: KeyedStore,
    {
        let values = self.select_values(&args)?;

        let result = (self.inner)(args).await?;

        let mut call_args = CallArgs::new();
        for value in values {
            call_args = call_args.arg(value);
        }
        let key = arg_hash(&call_args).to_string();
        self.repo.remove(&key).await?;
        debug!("Invalidated cache entry after write: {}", key);

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::Repository;
    use crate::store::MemoryBackend;
    use std::sync::Arc;

    struct UpdateArgs {
        user_id: i64,
        amount: i64,
    }

    impl BoundArgs for UpdateArgs {
        fn bound_args(&self) -> Result<Vec<(&'static str, ArgValue)>> {
            Ok(vec![
                ("user_id", self.user_id.into()),
                ("amount", self.amount.into()),
            ])
        }
    }

    fn repository() -> Repository {
        Repository::new(Arc::new(MemoryBackend::new()), "inv:")
    }

    #[tokio::test]
    async fn test_deletes_entry_for_selected_subset() {
        let repo = repository();

        // Entry keyed the way a positional read call would key it.
        let key = arg_hash(&CallArgs::new().arg(7i64)).to_string();
        repo.save(&key, &"stale".to_string(), None).await.unwrap();

        let invalidating = Invalidating::new(repo.clone(), |args: UpdateArgs| async move {
            Ok(args.amount)
        })
        .with_key_args(["user_id"]);

        let result = invalidating
            .call(UpdateArgs {
                user_id: 7,
                amount: 100,
            })
            .await
            .unwrap();

        assert_eq!(result, 100);
        assert_eq!(repo.get::<String>(&key).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_all_bound_args_without_key_args() {
        let repo = repository();

        let key = arg_hash(&CallArgs::new().arg(7i64).arg(100i64)).to_string();
        repo.save(&key, &"stale".to_string(), None).await.unwrap();

        let invalidating =
            Invalidating::new(repo.clone(), |args: UpdateArgs| async move { Ok(args.amount) });

        invalidating
            .call(UpdateArgs {
                user_id: 7,
                amount: 100,
            })
            .await
            .unwrap();

        assert_eq!(repo.get::<String>(&key).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_unknown_key_arg_is_config_error() {
        let invalidating = Invalidating::new(repository(), |args: UpdateArgs| async move {
            Ok(args.amount)
        })
        .with_key_args(["no_such_parameter"]);

        let err = invalidating
            .call(UpdateArgs {
                user_id: 1,
                amount: 2,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, CacheError::Config(_)));
    }

    #[tokio::test]
    async fn test_method_kind_drops_leading_value_with_key_args() {
        struct MethodArgs {
            receiver: String,
            id: i64,
        }

        impl BoundArgs for MethodArgs {
            fn bound_args(&self) -> Result<Vec<(&'static str, ArgValue)>> {
                Ok(vec![
                    ("self", self.receiver.clone().into()),
                    ("id", self.id.into()),
                ])
            }
        }

        let repo = repository();
        let key = arg_hash(&CallArgs::new().arg(42i64)).to_string();
        repo.save(&key, &"stale".to_string(), None).await.unwrap();

        let invalidating = Invalidating::new(repo.clone(), |args: MethodArgs| async move {
            let _ = args.receiver;
            Ok(())
        })
        .with_kind(CallableKind::Method)
        .with_key_args(["self", "id"]);

        invalidating
            .call(MethodArgs {
                receiver: "store".to_string(),
                id: 42,
            })
            .await
            .unwrap();

        assert_eq!(repo.get::<String>(&key).await.unwrap(), None);
    }
}
