use std::fmt;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::normalize::NormalizedRecord;
use crate::types::Collection;

use super::{GatewayError, PersistenceGateway};

type RejectRule = dyn Fn(Collection, &NormalizedRecord) -> Option<String> + Send + Sync;

/// A gateway that stores inserted records in memory.
///
/// Useful for validating a file end to end without touching the real store, and for tests.
/// An optional rule can reject individual records to simulate store-side failures.
#[derive(Default)]
pub struct MemoryGateway {
    records: Mutex<Vec<(Collection, NormalizedRecord)>>,
    reject: Option<Arc<RejectRule>>,
}

impl MemoryGateway {
    /// Create an empty gateway that accepts every record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject records for which `rule` returns a message.
    pub fn with_reject_rule<F>(mut self, rule: F) -> Self
    where
        F: Fn(Collection, &NormalizedRecord) -> Option<String> + Send + Sync + 'static,
    {
        self.reject = Some(Arc::new(rule));
        self
    }

    /// Snapshot of accepted records, in insert order.
    pub fn records(&self) -> Vec<(Collection, NormalizedRecord)> {
        self.records.lock().map(|g| g.clone()).unwrap_or_default()
    }

    /// Number of accepted records.
    pub fn len(&self) -> usize {
        self.records.lock().map(|g| g.len()).unwrap_or(0)
    }

    /// `true` if nothing has been accepted.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for MemoryGateway {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryGateway")
            .field("records_len", &self.len())
            .field("reject_rule_set", &self.reject.is_some())
            .finish()
    }
}

#[async_trait]
impl PersistenceGateway for MemoryGateway {
    async fn insert(&self, collection: Collection, record: &NormalizedRecord) -> Result<(), GatewayError> {
        if let Some(rule) = &self.reject {
            if let Some(message) = rule(collection, record) {
                return Err(GatewayError::rejected(message));
            }
        }

        let mut guard = self
            .records
            .lock()
            .map_err(|_| GatewayError::rejected("memory gateway lock poisoned"))?;
        guard.push((collection, record.clone()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::MemoryGateway;
    use crate::gateway::PersistenceGateway;
    use crate::normalize::{InsuranceProviderRecord, NormalizedRecord};
    use crate::types::Collection;

    fn provider(name: &str) -> NormalizedRecord {
        NormalizedRecord::InsuranceProvider(InsuranceProviderRecord {
            name: name.to_string(),
            contact_phone: None,
            contact_email: None,
            address: None,
        })
    }

    #[tokio::test]
    async fn reject_rule_blocks_matching_records() {
        let gw = MemoryGateway::new().with_reject_rule(|_, rec| match rec {
            NormalizedRecord::InsuranceProvider(p) if p.name == "Dup" => {
                Some("duplicate key value violates unique constraint".to_string())
            }
            _ => None,
        });

        gw.insert(Collection::InsuranceProviders, &provider("Acme")).await.unwrap();
        let err = gw
            .insert(Collection::InsuranceProviders, &provider("Dup"))
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "duplicate key value violates unique constraint");
        assert_eq!(gw.len(), 1);
        assert_eq!(gw.records()[0].0, Collection::InsuranceProviders);
    }
}
