use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};

use super::domain::{
    average_rating, EmployerId, HiringId, HiringRequest, HiringStatus, Housekeeper,
    HousekeeperId, HousekeeperUpdate, Review,
};
use super::repository::{
    EmployerRecord, HiringNotice, HiringNotifier, HousekeeperRecord, MarketplaceRepository,
    NotifyError, RepositoryError,
};

#[derive(Default)]
struct Tables {
    housekeepers: HashMap<HousekeeperId, HousekeeperRecord>,
    employers: HashMap<EmployerId, EmployerRecord>,
    hirings: HashMap<HiringId, HiringRequest>,
    reviews: Vec<Review>,
}

/// Process-local store backing the service binary and the tests.
#[derive(Default, Clone)]
pub struct InMemoryMarketplaceRepository {
    tables: Arc<Mutex<Tables>>,
}

impl InMemoryMarketplaceRepository {
    fn lock(&self) -> Result<MutexGuard<'_, Tables>, RepositoryError> {
        self.tables
            .lock()
            .map_err(|_| RepositoryError::Unavailable("repository mutex poisoned".to_string()))
    }
}

fn same_email(left: &str, right: &str) -> bool {
    left.trim().eq_ignore_ascii_case(right.trim())
}

fn by_creation(hirings: &mut [HiringRequest]) {
    hirings.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}

impl MarketplaceRepository for InMemoryMarketplaceRepository {
    fn insert_housekeeper(&self, record: HousekeeperRecord) -> Result<(), RepositoryError> {
        let mut tables = self.lock()?;
        let duplicate = tables.housekeepers.contains_key(&record.profile.id)
            || tables
                .housekeepers
                .values()
                .any(|existing| same_email(&existing.profile.email, &record.profile.email));
        if duplicate {
            return Err(RepositoryError::Conflict);
        }
        tables
            .housekeepers
            .insert(record.profile.id.clone(), record);
        Ok(())
    }

    fn fetch_housekeeper(
        &self,
        id: &HousekeeperId,
    ) -> Result<Option<HousekeeperRecord>, RepositoryError> {
        Ok(self.lock()?.housekeepers.get(id).cloned())
    }

    fn find_housekeeper_by_email(
        &self,
        email: &str,
    ) -> Result<Option<HousekeeperRecord>, RepositoryError> {
        Ok(self
            .lock()?
            .housekeepers
            .values()
            .find(|record| same_email(&record.profile.email, email))
            .cloned())
    }

    fn apply_housekeeper_update(
        &self,
        id: &HousekeeperId,
        update: HousekeeperUpdate,
        at: DateTime<Utc>,
    ) -> Result<Housekeeper, RepositoryError> {
        let mut tables = self.lock()?;
        let record = tables
            .housekeepers
            .get_mut(id)
            .ok_or(RepositoryError::NotFound)?;
        update.apply(&mut record.profile);
        record.profile.updated_at = at;
        Ok(record.profile.clone())
    }

    fn delete_housekeeper(&self, id: &HousekeeperId) -> Result<(), RepositoryError> {
        self.lock()?
            .housekeepers
            .remove(id)
            .map(|_| ())
            .ok_or(RepositoryError::NotFound)
    }

    fn list_housekeepers(&self) -> Result<Vec<HousekeeperRecord>, RepositoryError> {
        Ok(self.lock()?.housekeepers.values().cloned().collect())
    }

    fn insert_employer(&self, record: EmployerRecord) -> Result<(), RepositoryError> {
        let mut tables = self.lock()?;
        let duplicate = tables.employers.contains_key(&record.profile.id)
            || tables
                .employers
                .values()
                .any(|existing| same_email(&existing.profile.email, &record.profile.email));
        if duplicate {
            return Err(RepositoryError::Conflict);
        }
        tables.employers.insert(record.profile.id.clone(), record);
        Ok(())
    }

    fn fetch_employer(&self, id: &EmployerId) -> Result<Option<EmployerRecord>, RepositoryError> {
        Ok(self.lock()?.employers.get(id).cloned())
    }

    fn find_employer_by_email(
        &self,
        email: &str,
    ) -> Result<Option<EmployerRecord>, RepositoryError> {
        Ok(self
            .lock()?
            .employers
            .values()
            .find(|record| same_email(&record.profile.email, email))
            .cloned())
    }

    fn update_employer(&self, record: EmployerRecord) -> Result<(), RepositoryError> {
        let mut tables = self.lock()?;
        match tables.employers.get_mut(&record.profile.id) {
            Some(slot) => {
                *slot = record;
                Ok(())
            }
            None => Err(RepositoryError::NotFound),
        }
    }

    fn insert_hiring(&self, hiring: HiringRequest) -> Result<(), RepositoryError> {
        let mut tables = self.lock()?;
        if tables.hirings.contains_key(&hiring.id) {
            return Err(RepositoryError::Conflict);
        }
        tables.hirings.insert(hiring.id.clone(), hiring);
        Ok(())
    }

    fn fetch_hiring(&self, id: &HiringId) -> Result<Option<HiringRequest>, RepositoryError> {
        Ok(self.lock()?.hirings.get(id).cloned())
    }

    fn transition_hiring(
        &self,
        id: &HiringId,
        expected: HiringStatus,
        next: HiringStatus,
        at: DateTime<Utc>,
    ) -> Result<HiringRequest, RepositoryError> {
        let mut tables = self.lock()?;
        let hiring = tables.hirings.get_mut(id).ok_or(RepositoryError::NotFound)?;
        if hiring.status != expected {
            return Err(RepositoryError::StatusChanged {
                actual: hiring.status,
            });
        }
        hiring.status = next;
        hiring.updated_at = at;
        Ok(hiring.clone())
    }

    fn hirings_for_employer(
        &self,
        employer_id: &EmployerId,
    ) -> Result<Vec<HiringRequest>, RepositoryError> {
        let mut hirings: Vec<_> = self
            .lock()?
            .hirings
            .values()
            .filter(|hiring| &hiring.employer_id == employer_id)
            .cloned()
            .collect();
        by_creation(&mut hirings);
        Ok(hirings)
    }

    fn hirings_for_housekeeper(
        &self,
        housekeeper_id: &HousekeeperId,
    ) -> Result<Vec<HiringRequest>, RepositoryError> {
        let mut hirings: Vec<_> = self
            .lock()?
            .hirings
            .values()
            .filter(|hiring| &hiring.housekeeper_id == housekeeper_id)
            .cloned()
            .collect();
        by_creation(&mut hirings);
        Ok(hirings)
    }

    fn record_review(&self, review: Review) -> Result<f64, RepositoryError> {
        let mut tables = self.lock()?;
        if !tables.housekeepers.contains_key(&review.housekeeper_id) {
            return Err(RepositoryError::NotFound);
        }
        let housekeeper_id = review.housekeeper_id.clone();
        let at = review.created_at;
        tables.reviews.push(review);

        let reviews: Vec<Review> = tables
            .reviews
            .iter()
            .filter(|stored| stored.housekeeper_id == housekeeper_id)
            .cloned()
            .collect();
        let rating = average_rating(&reviews);
        if let Some(record) = tables.housekeepers.get_mut(&housekeeper_id) {
            record.profile.rating = rating;
            record.profile.updated_at = at;
        }
        Ok(rating)
    }

    fn reviews_for_housekeeper(
        &self,
        housekeeper_id: &HousekeeperId,
    ) -> Result<Vec<Review>, RepositoryError> {
        Ok(self
            .lock()?
            .reviews
            .iter()
            .filter(|review| &review.housekeeper_id == housekeeper_id)
            .cloned()
            .collect())
    }
}

/// Notifier that keeps every notice; used by tests.
#[derive(Default, Clone)]
pub struct RecordingNotifier {
    notices: Arc<Mutex<Vec<HiringNotice>>>,
}

impl RecordingNotifier {
    pub fn notices(&self) -> Vec<HiringNotice> {
        self.notices
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }
}

impl HiringNotifier for RecordingNotifier {
    fn hiring_created(&self, notice: HiringNotice) -> Result<(), NotifyError> {
        self.notices
            .lock()
            .map_err(|_| NotifyError::Transport("notice mutex poisoned".to_string()))?
            .push(notice);
        Ok(())
    }
}
