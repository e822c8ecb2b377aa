use std::collections::{HashMap, HashSet};
use std::hash::Hash;
use log::warn;
use crate::config::defs::{PipelineError, BAM_EXT};
use crate::samples::record::{Gender, Keyed, MergedSampleRecord, PatientKeyed, SampleKey};

/// Records of one sample: a lone run passes through, several runs need a
/// merge.
#[derive(Debug, Clone, PartialEq)]
pub enum SampleGroup<T> {
    Single(T),
    Grouped(SampleKey, Vec<T>),
}

impl<T: Keyed> SampleGroup<T> {
    pub fn key(&self) -> SampleKey {
        match self {
            SampleGroup::Single(record) => record.sample_key(),
            SampleGroup::Grouped(key, _) => key.clone(),
        }
    }

    pub fn needs_merge(&self) -> bool {
        matches!(self, SampleGroup::Grouped(..))
    }

    /// Collapses the group into one record listing every member's file.
    pub fn into_merged<F>(self, file_of: F) -> MergedSampleRecord
    where
        F: Fn(&T) -> std::path::PathBuf,
    {
        match self {
            SampleGroup::Single(record) => {
                let files = vec![file_of(&record)];
                MergedSampleRecord::new(record.sample_key(), files)
            }
            SampleGroup::Grouped(key, records) => {
                MergedSampleRecord::new(key, records.iter().map(file_of).collect())
            }
        }
    }
}

/// Name of the per-sample BAM, whether merged or renamed.
pub fn merged_bam_name(sample_id: &str) -> String {
    format!("{}{}", sample_id, BAM_EXT)
}

fn group_ordered<K, T, I>(records: I, key_of: impl Fn(&T) -> K) -> Vec<(K, Vec<T>)>
where
    K: Eq + Hash + Clone,
    I: IntoIterator<Item = T>,
{
    let mut index: HashMap<K, usize> = HashMap::new();
    let mut groups: Vec<(K, Vec<T>)> = Vec::new();
    for record in records {
        let key = key_of(&record);
        match index.get(&key) {
            Some(&i) => groups[i].1.push(record),
            None => {
                index.insert(key.clone(), groups.len());
                groups.push((key, vec![record]));
            }
        }
    }
    groups
}

/// Groups records by `(patientId, status, sampleId)`. Groups appear in the
/// order their first member arrived; members keep arrival order.
pub fn group_by_sample<T, I>(records: I) -> Vec<SampleGroup<T>>
where
    T: Keyed,
    I: IntoIterator<Item = T>,
{
    group_ordered(records, |r: &T| r.sample_key())
        .into_iter()
        .map(|(key, mut members)| {
            if members.len() == 1 {
                SampleGroup::Single(members.remove(0))
            } else {
                SampleGroup::Grouped(key, members)
            }
        })
        .collect()
}

/// First record whose key was already seen.
pub fn find_duplicate<T, K>(records: &[T], key_of: impl Fn(&T) -> K) -> Option<&T>
where
    K: Eq + Hash,
{
    let mut seen = HashSet::new();
    records.iter().find(|r| !seen.insert(key_of(r)))
}

/// First pair of records with different keys that map to the same output
/// name.
pub fn find_name_collision<T, K, N>(
    records: &[T],
    key_of: impl Fn(&T) -> K,
    name_of: impl Fn(&T) -> N,
) -> Option<(&T, &T)>
where
    K: PartialEq,
    N: Eq + Hash,
{
    let mut owners: HashMap<N, &T> = HashMap::new();
    for record in records {
        let name = name_of(record);
        match owners.get(&name) {
            Some(&first) if key_of(first) != key_of(record) => return Some((first, record)),
            Some(_) => {}
            None => {
                owners.insert(name, record);
            }
        }
    }
    None
}

/// Samples of one patient, tagged with the patient's gender.
#[derive(Debug, Clone, PartialEq)]
pub struct PatientGroup<T> {
    pub patient_id: String,
    pub gender: Gender,
    pub members: Vec<T>,
}

pub fn group_by_patient<T, I>(records: I, genders: &PatientGenderIndex) -> Vec<PatientGroup<T>>
where
    T: PatientKeyed,
    I: IntoIterator<Item = T>,
{
    group_ordered(records, |r: &T| r.patient_id().to_string())
        .into_iter()
        .map(|(patient_id, members)| PatientGroup {
            gender: genders.gender(&patient_id),
            patient_id,
            members,
        })
        .collect()
}

/// Gender of every patient seen in one invocation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PatientGenderIndex {
    genders: HashMap<String, Gender>,
}

impl PatientGenderIndex {
    /// Builds the index, rejecting a patient recorded with two different
    /// genders.
    pub fn build<'a, I>(entries: I) -> Result<Self, PipelineError>
    where
        I: IntoIterator<Item = (&'a str, Gender)>,
    {
        let mut genders: HashMap<String, Gender> = HashMap::new();
        for (patient, gender) in entries {
            match genders.get(patient) {
                Some(&first) if first != gender => {
                    return Err(PipelineError::InconsistentGender {
                        patient: patient.to_string(),
                        first: first.to_string(),
                        second: gender.to_string(),
                    });
                }
                Some(_) => {}
                None => {
                    genders.insert(patient.to_string(), gender);
                }
            }
        }
        Ok(PatientGenderIndex { genders })
    }

    /// Unknown patients map to `Gender::Unknown`.
    pub fn gender(&self, patient_id: &str) -> Gender {
        match self.genders.get(patient_id) {
            Some(gender) => *gender,
            None => {
                warn!("No gender recorded for patient {}", patient_id);
                Gender::Unknown
            }
        }
    }

    pub fn patient_count(&self) -> usize {
        self.genders.len()
    }
}
