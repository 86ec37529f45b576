use chrono::{NaiveDateTime, Timelike};
use tracing::warn;
use uuid::Uuid;

use crate::error::{AssemblyError, InvalidPublicationDate};
use crate::model::{Identifier, ImageSet, Member, PublicationAttributes, RawImageRef, RawImageSet};

use super::identifier;

pub const METHODE_AUTHORITY: &str = "http://api.ft.com/system/FTCOM-METHODE";
pub const IMAGE_SET_TYPE: &str = "ImageSet";
pub const CAN_BE_DISTRIBUTED: &str = "yes";
pub const SMALL_MAX_DISPLAY_WIDTH: &str = "490px";
pub const LARGE_MIN_DISPLAY_WIDTH: &str = "980px";

/// `YYYYMMDDHHMMSS`, UTC.
pub const NATIVE_DATE_FORMAT: &str = "%Y%m%d%H%M%S";
/// `YYYY-MM-DDTHH:MM:SS.sssZ`
pub const OUTPUT_DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

const UUID_SEPARATOR: &str = "?uuid=";

/// Build one output image-set per raw image-set, in input order.
///
/// Members are emitted as medium, small, large; variants without a usable
/// `fileref` are dropped. An image-set without members is still emitted.
/// Both publication timestamps must be valid or nothing is returned.
pub fn assemble(
    raw_sets: &[RawImageSet],
    attributes: &PublicationAttributes,
    last_modified: &str,
    publish_reference: &str,
) -> Result<Vec<ImageSet>, AssemblyError> {
    let published_date = reformat_date("DIFTcomLastPublication", &attributes.last_publication)?;
    let first_published_date =
        reformat_date("DIFTcomInitialPublication", &attributes.initial_publication)?;

    let image_sets = raw_sets
        .iter()
        .map(|raw| {
            let members: Vec<Member> = [
                member(raw, "medium", &raw.medium, None, None),
                member(raw, "small", &raw.small, Some(SMALL_MAX_DISPLAY_WIDTH), None),
                member(raw, "large", &raw.large, None, Some(LARGE_MIN_DISPLAY_WIDTH)),
            ]
            .into_iter()
            .flatten()
            .collect();

            let uuid = identifier::derive(&raw.id).to_string();
            ImageSet {
                identifiers: vec![Identifier {
                    authority: METHODE_AUTHORITY.to_string(),
                    identifier_value: uuid.clone(),
                }],
                uuid,
                members,
                publish_reference: publish_reference.to_string(),
                last_modified: last_modified.to_string(),
                published_date: published_date.clone(),
                first_published_date: first_published_date.clone(),
                can_be_distributed: CAN_BE_DISTRIBUTED.to_string(),
                kind: IMAGE_SET_TYPE.to_string(),
            }
        })
        .collect();
    Ok(image_sets)
}

fn member(
    raw: &RawImageSet,
    name: &'static str,
    image: &RawImageRef,
    max_display_width: Option<&str>,
    min_display_width: Option<&str>,
) -> Option<Member> {
    let Some(uuid) = referenced_uuid(&image.file_reference) else {
        if image.file_reference.is_empty() {
            warn!(member = name, image_set = %raw.id, "expected member is not present");
        } else {
            warn!(
                member = name,
                image_set = %raw.id,
                fileref = %image.file_reference,
                "fileref attribute doesn't contain a uuid"
            );
        }
        return None;
    };
    Some(Member {
        uuid: uuid.to_string(),
        max_display_width: max_display_width.map(str::to_string),
        min_display_width: min_display_width.map(str::to_string),
    })
}

/// The UUID after the single `?uuid=` separator of a file reference.
pub fn referenced_uuid(file_reference: &str) -> Option<&str> {
    let mut parts = file_reference.split(UUID_SEPARATOR);
    let _path = parts.next()?;
    let uuid = parts.next()?;
    if parts.next().is_some() || Uuid::parse_str(uuid).is_err() {
        return None;
    }
    Some(uuid)
}

fn reformat_date(field: &'static str, value: &str) -> Result<String, InvalidPublicationDate> {
    let invalid = || InvalidPublicationDate {
        field,
        value: value.to_string(),
    };
    if value.len() != 14 || !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    let parsed = NaiveDateTime::parse_from_str(value, NATIVE_DATE_FORMAT).map_err(|_| invalid())?;
    // chrono reads second 60 as a leap second.
    if parsed.nanosecond() >= 1_000_000_000 {
        return Err(invalid());
    }
    Ok(parsed.format(OUTPUT_DATE_FORMAT).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image(fileref: &str) -> RawImageRef {
        RawImageRef {
            file_reference: fileref.to_string(),
        }
    }

    fn attributes() -> PublicationAttributes {
        PublicationAttributes {
            last_publication: "20170518132425".into(),
            initial_publication: "20170518132400".into(),
        }
    }

    fn full_set() -> RawImageSet {
        RawImageSet {
            id: "U11603547146784PeC".into(),
            small: image("/FT/Graphics/timeline-s.png?uuid=4258f26a-13c5-11e7-9469-afea892e4de3"),
            medium: image("/FT/Graphics/timeline-m.png?uuid=41614f4c-13c5-11e7-9469-afea892e4de3"),
            large: image("/FT/Graphics/timeline-l.png?uuid=3ff3b7a8-13c5-11e7-9469-afea892e4de3"),
        }
    }

    #[test]
    fn assembles_full_image_set() {
        let sets = assemble(&[full_set()], &attributes(), "2017-05-17T13:46:01.100Z", "tid_test")
            .unwrap();
        assert_eq!(sets.len(), 1);
        let set = &sets[0];
        assert_eq!(set.uuid, "91f09ea2-90a6-34f9-aa61-80b3a80e41c4");
        assert_eq!(
            set.identifiers,
            vec![Identifier {
                authority: METHODE_AUTHORITY.into(),
                identifier_value: "91f09ea2-90a6-34f9-aa61-80b3a80e41c4".into(),
            }]
        );
        assert_eq!(
            set.members,
            vec![
                Member {
                    uuid: "41614f4c-13c5-11e7-9469-afea892e4de3".into(),
                    max_display_width: None,
                    min_display_width: None,
                },
                Member {
                    uuid: "4258f26a-13c5-11e7-9469-afea892e4de3".into(),
                    max_display_width: Some("490px".into()),
                    min_display_width: None,
                },
                Member {
                    uuid: "3ff3b7a8-13c5-11e7-9469-afea892e4de3".into(),
                    max_display_width: None,
                    min_display_width: Some("980px".into()),
                },
            ]
        );
        assert_eq!(set.published_date, "2017-05-18T13:24:25.000Z");
        assert_eq!(set.first_published_date, "2017-05-18T13:24:00.000Z");
        assert_eq!(set.last_modified, "2017-05-17T13:46:01.100Z");
        assert_eq!(set.publish_reference, "tid_test");
        assert_eq!(set.can_be_distributed, "yes");
        assert_eq!(set.kind, "ImageSet");
    }

    #[test]
    fn drops_members_without_uuid_but_keeps_order() {
        let mut raw = full_set();
        raw.medium = image("/FT/Graphics/timeline-m.png");
        let sets = assemble(&[raw], &attributes(), "lm", "tid").unwrap();
        let uuids: Vec<&str> = sets[0].members.iter().map(|m| m.uuid.as_str()).collect();
        assert_eq!(
            uuids,
            vec![
                "4258f26a-13c5-11e7-9469-afea892e4de3",
                "3ff3b7a8-13c5-11e7-9469-afea892e4de3",
            ]
        );
    }

    #[test]
    fn image_set_without_members_is_kept() {
        let raw = RawImageSet {
            id: "U1".into(),
            ..Default::default()
        };
        let sets = assemble(&[raw], &attributes(), "lm", "tid").unwrap();
        assert_eq!(sets.len(), 1);
        assert!(sets[0].members.is_empty());
    }

    #[test]
    fn invalid_last_publication_aborts() {
        let mut attrs = attributes();
        attrs.last_publication = "2017-05-18".into();
        let err = assemble(&[full_set(), full_set()], &attrs, "lm", "tid").unwrap_err();
        let AssemblyError::InvalidPublicationDate(date) = err;
        assert_eq!(date.field, "DIFTcomLastPublication");
    }

    #[test]
    fn invalid_initial_publication_aborts() {
        let mut attrs = attributes();
        attrs.initial_publication = "20171318132400".into();
        let err = assemble(&[full_set()], &attrs, "lm", "tid").unwrap_err();
        let AssemblyError::InvalidPublicationDate(date) = err;
        assert_eq!(date.field, "DIFTcomInitialPublication");
    }

    #[test]
    fn leap_second_publication_aborts() {
        let mut attrs = attributes();
        attrs.last_publication = "20170518132460".into();
        let err = assemble(&[full_set()], &attrs, "lm", "tid").unwrap_err();
        let AssemblyError::InvalidPublicationDate(date) = err;
        assert_eq!(date.field, "DIFTcomLastPublication");
        assert_eq!(date.value, "20170518132460");
    }

    #[test]
    fn missing_publication_dates_abort_even_without_image_sets() {
        let err = assemble(&[], &PublicationAttributes::default(), "lm", "tid");
        assert!(err.is_err());
    }

    #[test]
    fn referenced_uuid_requires_single_separator_and_valid_uuid() {
        assert_eq!(
            referenced_uuid("/a.png?uuid=2ae43059-c725-4e6f-95d7-45f04f2e33b6"),
            Some("2ae43059-c725-4e6f-95d7-45f04f2e33b6")
        );
        assert_eq!(referenced_uuid(""), None);
        assert_eq!(referenced_uuid("/a.png"), None);
        assert_eq!(referenced_uuid("/a.png?uuid="), None);
        assert_eq!(referenced_uuid("/a.png?uuid=not-a-uuid"), None);
        assert_eq!(
            referenced_uuid(
                "/a.png?uuid=2ae43059-c725-4e6f-95d7-45f04f2e33b6?uuid=2ae43059-c725-4e6f-95d7-45f04f2e33b6"
            ),
            None
        );
    }
}
