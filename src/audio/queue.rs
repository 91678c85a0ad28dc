use rand::seq::SliceRandom;
use std::{collections::VecDeque, time::Duration};
use tracing::{debug, info};

use crate::{audio::track::Track, error::MusicError};

/// Cola de reproducción de un guild.
///
/// `current` es la pista que está sonando y nunca aparece además en `items`.
#[derive(Debug)]
pub struct MusicQueue {
    items: VecDeque<Track>,
    current: Option<Track>,
    max_size: usize,
}

impl MusicQueue {
    pub fn new(max_size: usize) -> Self {
        Self {
            items: VecDeque::new(),
            current: None,
            max_size,
        }
    }

    /// Agrega un track al final o en `position` (0-based, `0..=len`).
    pub fn add(&mut self, track: Track, position: Option<usize>) -> Result<usize, MusicError> {
        let index = position.unwrap_or(self.items.len());
        if index > self.items.len() {
            return Err(MusicError::InvalidPosition);
        }
        if self.items.len() >= self.max_size {
            return Err(MusicError::QueueFull(self.max_size));
        }

        info!("➕ Agregado a la cola: {} (posición {})", track.title, index);
        self.items.insert(index, track);
        Ok(index)
    }

    /// Elimina y devuelve el track en `position` (`0..len`).
    pub fn remove(&mut self, position: usize) -> Result<Track, MusicError> {
        let track = self
            .items
            .remove(position)
            .ok_or(MusicError::InvalidPosition)?;
        debug!("❌ Track eliminado en posición {}", position);
        Ok(track)
    }

    /// Mueve un track: remove seguido de insert, ambos índices en `0..len`.
    pub fn move_track(&mut self, from: usize, to: usize) -> Result<&Track, MusicError> {
        if from >= self.items.len() || to >= self.items.len() {
            return Err(MusicError::InvalidPosition);
        }

        let track = self.remove(from)?;
        self.items.insert(to, track);
        debug!("📍 Track movido de posición {} a {}", from, to);
        Ok(&self.items[to])
    }

    /// Mezcla solo los pendientes; `current` no se toca.
    pub fn shuffle(&mut self) {
        let mut rng = rand::thread_rng();
        self.items.make_contiguous().shuffle(&mut rng);
        info!("🔀 Cola mezclada ({} tracks)", self.items.len());
    }

    /// Vacía los pendientes y devuelve cuántos había.
    pub fn clear(&mut self) -> usize {
        let removed = self.items.len();
        self.items.clear();
        info!("🗑️ Cola limpiada ({} tracks)", removed);
        removed
    }

    /// Pasa la cabeza de la cola a `current` y devuelve el `current` anterior.
    pub fn advance(&mut self) -> Option<Track> {
        let previous = self.current.take();
        self.current = self.items.pop_front();

        match &self.current {
            Some(next) => info!("➡️ Siguiente en cola: {}", next.title),
            None => info!("📭 Cola vacía, no hay siguiente track"),
        }

        previous
    }

    /// Reinsertar un track que ya pertenecía a la sesión (modo loop).
    /// No cuenta contra `max_size`.
    pub(crate) fn requeue(&mut self, track: Track, front: bool) {
        if front {
            debug!("🔂 Repitiendo track: {}", track.title);
            self.items.push_front(track);
        } else {
            debug!("🔁 Track agregado al final por loop de cola: {}", track.title);
            self.items.push_back(track);
        }
    }

    pub fn current(&self) -> Option<&Track> {
        self.current.as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn total_duration(&self) -> Duration {
        let pending: Duration = self.items.iter().map(|track| track.duration).sum();
        pending
            + self
                .current
                .as_ref()
                .map(|track| track.duration)
                .unwrap_or_default()
    }

    pub fn snapshot(&self) -> QueueInfo {
        QueueInfo {
            current: self.current.clone(),
            items: self.items.iter().cloned().collect(),
            total_duration: self.total_duration(),
        }
    }
}

/// Copia de la cola para mostrarla sin retener el lock de la sesión.
#[derive(Debug, Clone)]
pub struct QueueInfo {
    pub current: Option<Track>,
    pub items: Vec<Track>,
    pub total_duration: Duration,
}

impl QueueInfo {
    /// Obtiene una página (1-based) de la cola.
    pub fn page(&self, page: usize, per_page: usize) -> QueuePage<'_> {
        let per_page = per_page.max(1);
        let total_pages = self.items.len().div_ceil(per_page).max(1);
        let current_page = page.clamp(1, total_pages);
        let start = (current_page - 1) * per_page;
        let end = (start + per_page).min(self.items.len());

        QueuePage {
            offset: start,
            items: &self.items[start..end],
            current_page,
            total_pages,
        }
    }
}

#[derive(Debug)]
pub struct QueuePage<'a> {
    pub offset: usize,
    pub items: &'a [Track],
    pub current_page: usize,
    pub total_pages: usize,
}

#[cfg(test)]
impl MusicQueue {
    pub fn pending(&self) -> impl Iterator<Item = &Track> {
        self.items.iter()
    }

    pub fn get(&self, position: usize) -> Option<&Track> {
        self.items.get(position)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }
}
