use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

use crate::errors::AppError;

/// Academic branches a student can enroll under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Branch {
    Cse,
    CseAiml,
    CseDs,
    It,
    Ece,
    Eee,
    Mech,
    Civil,
}

impl Branch {
    pub const ALL: [Branch; 8] = [
        Branch::Cse,
        Branch::CseAiml,
        Branch::CseDs,
        Branch::It,
        Branch::Ece,
        Branch::Eee,
        Branch::Mech,
        Branch::Civil,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Branch::Cse => "CSE",
            Branch::CseAiml => "CSE (AI&ML)",
            Branch::CseDs => "CSE (DS)",
            Branch::It => "IT",
            Branch::Ece => "ECE",
            Branch::Eee => "EEE",
            Branch::Mech => "Mech",
            Branch::Civil => "Civil",
        }
    }
}

impl fmt::Display for Branch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Branch {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Branch::ALL
            .into_iter()
            .find(|b| b.label().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| AppError::Validation(format!("Unknown branch '{wanted}'")))
    }
}

impl Serialize for Branch {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

/// One student's profile. `uid` doubles as the record key.
#[derive(Debug, Clone, PartialEq)]
pub struct StudentRecord {
    pub uid: String,
    pub name: String,
    pub email: String,
    pub branch: Branch,
    pub cgpa: f64,
    pub resume_url: String,
    /// Storage metadata; not part of the wire shape.
    pub updated_at: DateTime<Utc>,
}

impl StudentRecord {
    /// The record identifier. Always equal to the owner's uid.
    pub fn id(&self) -> &str {
        &self.uid
    }
}

/// Wire shape shared by the dashboard, submit responses and live events.
#[derive(Serialize)]
struct StudentRecordJson<'a> {
    id: &'a str,
    uid: &'a str,
    name: &'a str,
    email: &'a str,
    branch: Branch,
    cgpa: f64,
    #[serde(rename = "resumeURL")]
    resume_url: &'a str,
}

impl Serialize for StudentRecord {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        StudentRecordJson {
            id: self.id(),
            uid: &self.uid,
            name: &self.name,
            email: &self.email,
            branch: self.branch,
            cgpa: self.cgpa,
            resume_url: &self.resume_url,
        }
        .serialize(serializer)
    }
}

/// Row shape of the `students` table.
#[derive(Debug, Clone, FromRow)]
pub struct StudentRow {
    pub uid: String,
    pub name: String,
    pub email: String,
    pub branch: String,
    pub cgpa: f64,
    pub resume_url: String,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<StudentRow> for StudentRecord {
    type Error = AppError;

    fn try_from(row: StudentRow) -> Result<Self, Self::Error> {
        Ok(StudentRecord {
            branch: row.branch.parse()?,
            uid: row.uid,
            name: row.name,
            email: row.email,
            cgpa: row.cgpa,
            resume_url: row.resume_url,
            updated_at: row.updated_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_branch_parse_is_case_insensitive() {
        assert_eq!("cse".parse::<Branch>().unwrap(), Branch::Cse);
        assert_eq!(" cse (ai&ml) ".parse::<Branch>().unwrap(), Branch::CseAiml);
        assert_eq!("MECH".parse::<Branch>().unwrap(), Branch::Mech);
    }

    #[test]
    fn test_unknown_branch_is_validation_error() {
        let err = "Astrology".parse::<Branch>().unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn test_record_json_uses_resume_url_key() {
        let record = StudentRecord {
            uid: "u1".into(),
            name: "Asha".into(),
            email: "asha@college.edu".into(),
            branch: Branch::Cse,
            cgpa: 8.5,
            resume_url: "memory://resumes/u1/resume.pdf".into(),
            updated_at: Utc::now(),
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["resumeURL"], "memory://resumes/u1/resume.pdf");
        assert_eq!(json["branch"], "CSE");
        assert_eq!(record.id(), "u1");
    }

    #[test]
    fn test_record_json_carries_id_and_hides_metadata() {
        let record = StudentRecord {
            uid: "u1".into(),
            name: "Asha".into(),
            email: "asha@college.edu".into(),
            branch: Branch::CseDs,
            cgpa: 9.0,
            resume_url: String::new(),
            updated_at: Utc::now(),
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["id"], json["uid"]);
        assert_eq!(json["id"], "u1");
        assert!(json.get("updated_at").is_none());

        let mut keys: Vec<&str> = json.as_object().unwrap().keys().map(String::as_str).collect();
        keys.sort_unstable();
        let mut expected = ["id", "uid", "name", "email", "branch", "cgpa", "resumeURL"];
        expected.sort_unstable();
        assert_eq!(keys, expected);
    }
}
