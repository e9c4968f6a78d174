use std::sync::Arc;

use rtrb::{Consumer, Producer, RingBuffer};

use crate::{
    bank::{BankId, InstrumentBank},
    error::{Result, SynthError},
};

/// Loaded banks in load order, with ids that are never reused.
pub struct BankTable {
    banks: Vec<(BankId, Arc<InstrumentBank>)>,
    max_banks: usize,
    next_id: u32,
}

impl BankTable {
    pub fn new(max_banks: usize) -> Self {
        Self {
            banks: Vec::with_capacity(max_banks),
            max_banks,
            next_id: 1,
        }
    }

    pub fn insert(&mut self, bank: Arc<InstrumentBank>) -> Result<BankId> {
        if self.banks.len() >= self.max_banks {
            return Err(SynthError::OutOfBanks(self.max_banks));
        }
        let id = BankId(self.next_id);
        self.next_id += 1;
        self.banks.push((id, bank));
        Ok(id)
    }

    pub fn remove(&mut self, id: BankId) -> Option<Arc<InstrumentBank>> {
        let idx = self.banks.iter().position(|(bank_id, _)| *bank_id == id)?;
        Some(self.banks.remove(idx).1)
    }

    pub fn get(&self, id: BankId) -> Option<&Arc<InstrumentBank>> {
        self.banks
            .iter()
            .find(|(bank_id, _)| *bank_id == id)
            .map(|(_, bank)| bank)
    }

    /// Most recently loaded first.
    pub fn newest_first(&self) -> impl Iterator<Item = (BankId, &Arc<InstrumentBank>)> {
        self.banks.iter().rev().map(|(id, bank)| (*id, bank))
    }

    pub fn ids(&self) -> Vec<BankId> {
        self.banks.iter().map(|(id, _)| *id).collect()
    }

    pub fn len(&self) -> usize {
        self.banks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.banks.is_empty()
    }
}

/// Render-side end of the reclamation queue. Bank references released by
/// finished voices are parked here instead of being dropped in the callback.
pub struct Retired {
    tx: Producer<Arc<InstrumentBank>>,
}

impl Retired {
    pub fn retire(&mut self, bank: Option<Arc<InstrumentBank>>) {
        if let Some(bank) = bank {
            // Capacity covers every voice plus every bank; a full queue
            // means nothing is draining it.
            if self.tx.push(bank).is_err() {
                debug_assert!(false, "bank reclamation queue overflow");
            }
        }
    }
}

/// Control-side end of the reclamation queue.
pub struct Reclaimer {
    rx: Consumer<Arc<InstrumentBank>>,
}

impl Reclaimer {
    /// Drop every parked reference; returns how many were dropped.
    pub fn drain(&mut self) -> usize {
        let mut count = 0;
        while let Ok(bank) = self.rx.pop() {
            drop(bank);
            count += 1;
        }
        count
    }
}

pub fn retirement(capacity: usize) -> (Retired, Reclaimer) {
    let (tx, rx) = RingBuffer::new(capacity.max(1));
    (Retired { tx }, Reclaimer { rx })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bank::BankBuilder;

    fn bank(name: &str) -> Arc<InstrumentBank> {
        Arc::new(BankBuilder::new(name).build().unwrap())
    }

    #[test]
    fn ids_are_never_reused() {
        let mut table = BankTable::new(2);
        let a = table.insert(bank("a")).unwrap();
        table.remove(a).unwrap();
        let b = table.insert(bank("b")).unwrap();

        assert_ne!(a, b);
        assert!(b.get() > a.get());
    }

    #[test]
    fn table_is_bounded() {
        let mut table = BankTable::new(1);
        table.insert(bank("a")).unwrap();

        assert!(matches!(
            table.insert(bank("b")),
            Err(SynthError::OutOfBanks(1))
        ));
    }

    #[test]
    fn newest_bank_comes_first() {
        let mut table = BankTable::new(4);
        table.insert(bank("old")).unwrap();
        table.insert(bank("new")).unwrap();

        let names: Vec<&str> = table.newest_first().map(|(_, b)| b.name()).collect();
        assert_eq!(names, vec!["new", "old"]);
    }

    #[test]
    fn retired_banks_are_dropped_by_the_reclaimer() {
        let (mut retired, mut reclaimer) = retirement(4);
        let shared = bank("shared");
        retired.retire(Some(shared.clone()));
        retired.retire(None);

        assert_eq!(Arc::strong_count(&shared), 2);
        assert_eq!(reclaimer.drain(), 1);
        assert_eq!(Arc::strong_count(&shared), 1);
    }
}
