//! Reconciles the raw certificate list into what the wallet shows.
//!
//! A holder usually owns several records of the same dose series (a partial
//! certificate after the first shot, a full one after the second). These
//! functions group records by [`Identity`], collapse every group into a
//! single entry and move the favorite holder to the front. None of them touch
//! storage; callers persist whatever collection they get back.

use std::collections::VecDeque;

use tracing::trace;

use crate::{
    Error, Result,
    certificate::{Certificate, CertificateCollection, DisplayEntry, Identity},
};

/// Moves the first certificate belonging to `favorite` to the front.
///
/// All other certificates keep their relative order. A missing, empty or
/// dangling favorite leaves the order untouched.
pub fn sort_favorite(
    certificates: &[Certificate],
    favorite: Option<&Identity>,
) -> Vec<Certificate> {
    let mut sorted = certificates.to_vec();

    let position = favorite
        .filter(|f| !f.is_empty())
        .and_then(|f| sorted.iter().position(|c| c.has_identity(f)));

    if let Some(head) = position.and_then(|p| sorted.get_mut(..=p)) {
        head.rotate_right(1);
    }

    sorted
}

/// Collapses every pair group into one certificate, in group-formation order.
///
/// Groups are formed front to back, so whatever sits first in `certificates`
/// ends up in the first reduced entry. Certificates without an identity form
/// singleton groups.
pub fn match_and_reduce(certificates: &[Certificate]) -> Vec<Certificate> {
    let mut pending: VecDeque<&Certificate> = certificates.iter().collect();
    let mut reduced = Vec::new();

    while let Some(head) = pending.pop_front() {
        let (matches, rest): (VecDeque<&Certificate>, VecDeque<&Certificate>) =
            pending.into_iter().partition(|c| head.same_identity(c));
        pending = rest;

        let mut group = Vec::with_capacity(matches.len() + 1);
        group.push(head);
        group.extend(matches);

        trace!("Formed pair group of {} for {}", group.len(), head.name);

        if let Some(certificate) = reduce_group(&group) {
            reduced.push(certificate.clone());
        }
    }

    reduced
}

/// Picks the certificate that represents a pair group.
///
/// The first full certificate wins. Without one, the partial certificate with
/// the latest vaccination date is used, and among equal dates the one found
/// last.
fn reduce_group<'a>(group: &[&'a Certificate]) -> Option<&'a Certificate> {
    if let Some(full) = group
        .iter()
        .copied()
        .find(|c| !c.is_partial_vaccination())
    {
        return Some(full);
    }

    group
        .iter()
        .copied()
        .fold(None, |best: Option<&Certificate>, candidate| match best {
            Some(b) if b.vaccination_date > candidate.vaccination_date => Some(b),
            _ => Some(candidate),
        })
}

/// Favorite-sorts and reduces a collection, without the empty placeholder.
pub fn reconcile(collection: &CertificateCollection) -> Vec<Certificate> {
    let sorted = sort_favorite(&collection.certificates, collection.favorite.as_ref());
    match_and_reduce(&sorted)
}

/// The entries to show for `collection`. Never empty: an empty wallet yields a
/// single [`DisplayEntry::Empty`].
pub fn display_entries(collection: &CertificateCollection) -> Vec<DisplayEntry> {
    let entries: Vec<DisplayEntry> = reconcile(collection)
        .into_iter()
        .map(DisplayEntry::from_certificate)
        .collect();

    if entries.is_empty() {
        vec![DisplayEntry::Empty]
    } else {
        entries
    }
}

/// Returns a new collection with `certificate` appended.
///
/// Fails with [`Error::DuplicateCertificate`] if a stored certificate was
/// imported from exactly the same `raw_payload`. The first certificate ever
/// imported becomes the favorite; while no favorite is set, the next
/// certificate with a decodable identity takes that place.
pub fn import_certificate(
    collection: &CertificateCollection,
    raw_payload: &str,
    certificate: Certificate,
) -> Result<CertificateCollection> {
    if collection.contains_payload(raw_payload) {
        return Err(Error::DuplicateCertificate);
    }

    let mut updated = collection.clone();
    if updated.is_empty() || updated.favorite.is_none() {
        updated.favorite = certificate.identity.clone();
    }
    updated.certificates.push(certificate);

    Ok(updated)
}

/// Returns a new collection whose favorite points at `identity`.
pub fn set_favorite(
    collection: &CertificateCollection,
    identity: &Identity,
) -> Result<CertificateCollection> {
    if !collection.certificates.iter().any(|c| c.has_identity(identity)) {
        return Err(Error::UnknownIdentity(identity.clone()));
    }

    let mut updated = collection.clone();
    updated.favorite = Some(identity.clone());

    Ok(updated)
}

/// Every raw record that shares `certificate`'s identity.
///
/// `certificate` always comes first, followed by the matching records of
/// `certificates` in their stored order.
pub fn pair_for(certificate: &Certificate, certificates: &[Certificate]) -> Vec<Certificate> {
    if certificates.is_empty() {
        return Vec::new();
    }

    let mut group = vec![certificate.clone()];
    for candidate in certificates {
        if certificate.same_identity(candidate) && !group.contains(candidate) {
            group.push(candidate.clone());
        }
    }

    group
}

/// The pair group behind the display entry at `index`.
///
/// Empty if the collection is empty or `index` is out of range.
pub fn pair_at(index: usize, collection: &CertificateCollection) -> Vec<Certificate> {
    reconcile(collection)
        .get(index)
        .map(|c| pair_for(c, &collection.certificates))
        .unwrap_or_default()
}

#[cfg(test)]
mod test {
    use chrono::NaiveDate;

    use super::*;
    use crate::certificate::mock_certificate;

    fn payloads(certificates: &[Certificate]) -> Vec<&str> {
        certificates.iter().map(|c| c.raw_payload.as_str()).collect()
    }

    fn scenario() -> CertificateCollection {
        CertificateCollection::new(
            vec![
                mock_certificate("alice", true, "p1"),
                mock_certificate("bob", false, "p2"),
                mock_certificate("alice", false, "p3"),
            ],
            Some("bob".into()),
        )
    }

    #[test]
    fn test_sort_favorite() {
        let collection = scenario();

        let sorted = sort_favorite(&collection.certificates, collection.favorite.as_ref());

        assert_eq!(payloads(&sorted), ["p2", "p1", "p3"]);
    }

    #[test]
    fn test_sort_favorite_idempotent() {
        let collection = scenario();
        let favorite = collection.favorite.as_ref();

        let once = sort_favorite(&collection.certificates, favorite);
        let twice = sort_favorite(&once, favorite);

        assert_eq!(once, twice);
    }

    #[test]
    fn test_sort_favorite_moves_only_first_match() {
        let certificates = vec![
            mock_certificate("alice", true, "p1"),
            mock_certificate("bob", true, "p2"),
            mock_certificate("carol", false, "p3"),
            mock_certificate("bob", false, "p4"),
        ];

        let sorted = sort_favorite(&certificates, Some(&"bob".into()));

        assert_eq!(payloads(&sorted), ["p2", "p1", "p3", "p4"]);
    }

    #[test]
    fn test_sort_favorite_no_match() {
        let collection = scenario();

        let sorted = sort_favorite(&collection.certificates, Some(&"carol".into()));

        assert_eq!(sorted, collection.certificates);
    }

    #[test]
    fn test_sort_favorite_absent_or_empty() {
        let collection = scenario();

        assert_eq!(sort_favorite(&collection.certificates, None), collection.certificates);
        assert_eq!(
            sort_favorite(&collection.certificates, Some(&"".into())),
            collection.certificates
        );
    }

    #[test]
    fn test_match_and_reduce() {
        let collection = scenario();

        let reduced = reconcile(&collection);

        assert_eq!(payloads(&reduced), ["p2", "p3"]);
        assert!(reduced.iter().all(|c| !c.is_partial_vaccination()));
    }

    #[test]
    fn test_match_and_reduce_empty() {
        assert!(match_and_reduce(&[]).is_empty());
    }

    #[test]
    fn test_match_and_reduce_covers_every_identity_once() {
        let certificates = vec![
            mock_certificate("alice", true, "p1"),
            mock_certificate("bob", true, "p2"),
            mock_certificate("alice", false, "p3"),
            mock_certificate("carol", false, "p4"),
            mock_certificate("bob", true, "p5"),
            mock_certificate("alice", false, "p6"),
        ];

        let reduced = match_and_reduce(&certificates);
        let identities: Vec<&str> = reduced
            .iter()
            .map(|c| c.identity.as_ref().unwrap().as_str())
            .collect();

        assert_eq!(identities, ["alice", "bob", "carol"]);
    }

    #[test]
    fn test_match_and_reduce_prefers_first_full() {
        let certificates = vec![
            mock_certificate("alice", false, "p1"),
            mock_certificate("alice", true, "p2"),
            mock_certificate("alice", false, "p3"),
        ];

        let reduced = match_and_reduce(&certificates);

        assert_eq!(payloads(&reduced), ["p1"]);
    }

    #[test]
    fn test_match_and_reduce_latest_partial_wins() {
        let mut older = mock_certificate("alice", true, "p1");
        older.vaccination_date = NaiveDate::from_ymd_opt(2021, 6, 1);
        let mut newer = mock_certificate("alice", true, "p2");
        newer.vaccination_date = NaiveDate::from_ymd_opt(2021, 7, 1);
        let undated = mock_certificate("alice", true, "p3");

        let reduced = match_and_reduce(&[older, newer, undated]);

        assert_eq!(payloads(&reduced), ["p2"]);
    }

    #[test]
    fn test_match_and_reduce_partial_tie_takes_last() {
        let certificates = vec![
            mock_certificate("alice", true, "p1"),
            mock_certificate("alice", true, "p2"),
        ];

        let reduced = match_and_reduce(&certificates);

        assert_eq!(payloads(&reduced), ["p2"]);
        assert!(reduced.first().unwrap().is_partial_vaccination());
    }

    #[test]
    fn test_match_and_reduce_keeps_undecodable_as_singletons() {
        let mut first = mock_certificate("alice", true, "p1");
        first.identity = None;
        let mut second = mock_certificate("alice", true, "p2");
        second.identity = None;

        let reduced = match_and_reduce(&[first, second, mock_certificate("alice", false, "p3")]);

        assert_eq!(payloads(&reduced), ["p1", "p2", "p3"]);
    }

    #[test]
    fn test_display_entries() {
        let entries = display_entries(&scenario());

        assert_eq!(entries.len(), 2);
        assert!(matches!(entries.first(), Some(DisplayEntry::Full(c)) if c.raw_payload == "p2"));
        assert!(matches!(entries.last(), Some(DisplayEntry::Full(c)) if c.raw_payload == "p3"));
    }

    #[test]
    fn test_display_entries_partial_only() {
        let collection =
            CertificateCollection::new(vec![mock_certificate("alice", true, "p1")], None);

        let entries = display_entries(&collection);

        assert!(matches!(entries.as_slice(), [DisplayEntry::Partial(_)]));
    }

    #[test]
    fn test_display_entries_empty_placeholder() {
        let entries = display_entries(&CertificateCollection::default());

        assert_eq!(entries, vec![DisplayEntry::Empty]);
    }

    #[test]
    fn test_import() {
        let collection = CertificateCollection::default();

        let updated =
            import_certificate(&collection, "p1", mock_certificate("alice", true, "p1")).unwrap();

        assert_eq!(updated.len(), 1);
        assert_eq!(updated.favorite, Some("alice".into()));
    }

    #[test]
    fn test_import_keeps_existing_favorite() {
        let collection = scenario();

        let updated =
            import_certificate(&collection, "p4", mock_certificate("carol", false, "p4")).unwrap();

        assert_eq!(updated.len(), 4);
        assert_eq!(updated.favorite, Some("bob".into()));
        assert_eq!(updated.certificates.last().unwrap().raw_payload, "p4");
    }

    #[test]
    fn test_import_seeds_favorite_after_undecodable_first() {
        let mut undecodable = mock_certificate("alice", true, "p1");
        undecodable.identity = None;

        let collection =
            import_certificate(&CertificateCollection::default(), "p1", undecodable).unwrap();
        assert!(collection.favorite.is_none());

        let updated =
            import_certificate(&collection, "p2", mock_certificate("bob", false, "p2")).unwrap();
        assert_eq!(updated.favorite, Some("bob".into()));

        let later =
            import_certificate(&updated, "p3", mock_certificate("carol", false, "p3")).unwrap();
        assert_eq!(later.favorite, Some("bob".into()));
    }

    #[test]
    fn test_import_duplicate() {
        let collection = scenario();
        let before = collection.clone();

        let result = import_certificate(&collection, "p2", mock_certificate("bob", false, "p2"));

        assert!(matches!(result, Err(Error::DuplicateCertificate)));
        assert_eq!(collection, before);
    }

    #[test]
    fn test_set_favorite() {
        let updated = set_favorite(&scenario(), &"alice".into()).unwrap();

        assert_eq!(payloads(&reconcile(&updated)), ["p3", "p2"]);
    }

    #[test]
    fn test_set_unknown_favorite() {
        assert!(matches!(
            set_favorite(&scenario(), &"carol".into()),
            Err(Error::UnknownIdentity(_))
        ));
    }

    #[test]
    fn test_pair_for() {
        let collection = scenario();
        let full_alice = collection.certificates.last().unwrap();

        let pair = pair_for(full_alice, &collection.certificates);

        assert_eq!(payloads(&pair), ["p3", "p1"]);
    }

    #[test]
    fn test_pair_for_empty_collection() {
        let certificate = mock_certificate("alice", true, "p1");

        assert!(pair_for(&certificate, &[]).is_empty());
    }

    #[test]
    fn test_pair_at() {
        let collection = scenario();

        assert_eq!(payloads(&pair_at(0, &collection)), ["p2"]);
        assert_eq!(payloads(&pair_at(1, &collection)), ["p3", "p1"]);
        assert!(pair_at(2, &collection).is_empty());
        assert!(pair_at(0, &CertificateCollection::default()).is_empty());
    }
}
