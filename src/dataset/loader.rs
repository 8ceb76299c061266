use candle_core::{Device, Tensor};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use crate::embedding::TokenizedBatch;

use super::error::DatasetError;
use super::paired::PairedDataset;

/// One collated mini-batch.
#[derive(Debug, Clone)]
pub struct PairBatch {
    /// Position of the batch within its epoch.
    pub index: usize,
    pub queries: TokenizedBatch,
    pub documents: TokenizedBatch,
    /// Relevance labels, `[B]`.
    pub labels: Tensor,
    size: usize,
}

impl PairBatch {
    pub fn len(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }
}

/// Yields device-resident batches of a [`PairedDataset`], one epoch at a time.
pub struct BatchLoader<'a> {
    dataset: &'a PairedDataset,
    batch_size: usize,
    device: Device,
    /// `Some` for training (reshuffled each epoch), `None` for in-order iteration.
    rng: Option<StdRng>,
}

impl<'a> BatchLoader<'a> {
    /// Training loader; every call to [`epoch`](Self::epoch) draws a fresh permutation.
    pub fn shuffled(dataset: &'a PairedDataset, batch_size: usize, seed: u64, device: &Device) -> Self {
        assert!(batch_size > 0, "batch_size must be greater than 0");
        Self {
            dataset,
            batch_size,
            device: device.clone(),
            rng: Some(StdRng::seed_from_u64(seed)),
        }
    }

    /// Validation loader; batches follow dataset order.
    pub fn sequential(dataset: &'a PairedDataset, batch_size: usize, device: &Device) -> Self {
        assert!(batch_size > 0, "batch_size must be greater than 0");
        Self {
            dataset,
            batch_size,
            device: device.clone(),
            rng: None,
        }
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn dataset_len(&self) -> usize {
        self.dataset.len()
    }

    /// `ceil(len / batch_size)`; the last batch may be short.
    pub fn num_batches(&self) -> usize {
        self.dataset.len().div_ceil(self.batch_size)
    }

    /// Index order for the next epoch.
    fn next_order(&mut self) -> Vec<usize> {
        let mut order: Vec<usize> = (0..self.dataset.len()).collect();
        if let Some(rng) = self.rng.as_mut() {
            order.shuffle(rng);
        }
        order
    }

    pub fn epoch(&mut self) -> impl Iterator<Item = Result<PairBatch, DatasetError>> + '_ {
        let order = self.next_order();
        let this: &Self = self;
        let batches: Vec<Vec<usize>> = order.chunks(this.batch_size).map(<[usize]>::to_vec).collect();

        batches
            .into_iter()
            .enumerate()
            .map(move |(index, indices)| this.collate(index, &indices))
    }

    fn collate(&self, index: usize, indices: &[usize]) -> Result<PairBatch, DatasetError> {
        let pairs = indices
            .iter()
            .map(|&i| self.dataset.get(i))
            .collect::<Result<Vec<_>, _>>()?;

        let queries: Vec<_> = pairs.iter().map(|p| &p.query).collect();
        let documents: Vec<_> = pairs.iter().map(|p| &p.document).collect();
        let labels: Vec<f32> = pairs.iter().map(|p| p.label).collect();

        Ok(PairBatch {
            index,
            queries: TokenizedBatch::collate(&queries, &self.device)?,
            documents: TokenizedBatch::collate(&documents, &self.device)?,
            labels: Tensor::from_vec(labels, pairs.len(), &self.device)?,
            size: pairs.len(),
        })
    }
}
