use crate::model::id::{self, UserId};

/// 参加者リストとキャンセル待ちリストの組。
///
/// 不変条件:
/// - 同じユーザー ID が両リストにまたがって存在しない
/// - 各リスト内に重複がない
/// - キャンセル待ちは FIFO（先頭が最古）
///
/// リストの書き換えはすべてこの型を経由する。ハンドラーや
/// リポジトリが直接 Vec を触ってはいけない。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Roster {
    pub participants: Vec<UserId>,
    pub waitlist: Vec<UserId>,
}

/// join でユーザーがどちらのリストに入ったか
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    Participant,
    Waitlisted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JoinOutcome {
    pub placement: Placement,
    /// すでに入っていた場合は true（リストは変化していない）
    pub already_joined: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Removal {
    pub was_participant: bool,
    pub was_waitlisted: bool,
    /// 繰り上がったユーザー（いなければ None）
    pub promoted: Option<UserId>,
}

/// 正規化の前後のリスト長。書き戻しの要否は [`Roster::differs_from`] で判定する。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizationReport {
    pub before_participants: usize,
    pub after_participants: usize,
    pub before_waitlist: usize,
    pub after_waitlist: usize,
}

impl NormalizationReport {
    pub fn removed(&self) -> usize {
        (self.before_participants + self.before_waitlist)
            .saturating_sub(self.after_participants + self.after_waitlist)
    }
}

impl Roster {
    /// 永続化された生のリストと内容が食い違っているか。
    /// 正規化が空白除去だけを行った（件数が変わらない）ケースも拾う。
    pub fn differs_from(&self, raw_participants: &[String], raw_waitlist: &[String]) -> bool {
        fn ne(cleaned: &[UserId], raw: &[String]) -> bool {
            cleaned.len() != raw.len()
                || cleaned.iter().zip(raw).any(|(u, r)| u.as_str() != r)
        }
        ne(&self.participants, raw_participants) || ne(&self.waitlist, raw_waitlist)
    }

    pub fn placement_of(&self, user_id: &UserId) -> Option<Placement> {
        if self.participants.contains(user_id) {
            Some(Placement::Participant)
        } else if self.waitlist.contains(user_id) {
            Some(Placement::Waitlisted)
        } else {
            None
        }
    }

    /// 参加申込。定員に空きがあれば参加者へ、なければキャンセル待ちの
    /// 末尾へ追加する。すでにどちらかに入っていれば何もしない（冪等）。
    pub fn join(&mut self, user_id: UserId, capacity: usize) -> JoinOutcome {
        if let Some(placement) = self.placement_of(&user_id) {
            return JoinOutcome {
                placement,
                already_joined: true,
            };
        }
        let placement = if self.participants.len() < capacity {
            self.participants.push(user_id);
            Placement::Participant
        } else {
            self.waitlist.push(user_id);
            Placement::Waitlisted
        };
        JoinOutcome {
            placement,
            already_joined: false,
        }
    }

    /// 参加者・キャンセル待ちの両方から対象を外す（いなければ何もしない）。
    ///
    /// `promote` が true で、外した対象が「参加者」だった場合のみ、
    /// キャンセル待ちの先頭を参加者へ繰り上げる。キャンセル待ちからの
    /// 離脱は枠を空けないので繰り上げは起きない。
    pub fn remove(&mut self, target: &UserId, promote: bool) -> Removal {
        let was_participant = self.participants.contains(target);
        let was_waitlisted = self.waitlist.contains(target);
        self.participants.retain(|u| u != target);
        self.waitlist.retain(|u| u != target);

        let mut promoted = None;
        if promote && was_participant && !self.waitlist.is_empty() {
            let next = self.waitlist.remove(0);
            // 壊れたデータで既に参加者にいる場合は二重登録しない
            if !self.participants.contains(&next) {
                self.participants.push(next.clone());
            }
            promoted = Some(next);
        }

        Removal {
            was_participant,
            was_waitlisted,
            promoted,
        }
    }
}

/// 永続化された生のリストから、修復済みの [`Roster`] を組み立てる。
///
/// 各リストについて: 前後空白を除去し、空文字・ダミー値・
/// `<provider>:<subject>` 形でない値を捨て、先勝ちで重複排除する。
/// その後、両リストに同じ ID がいる場合は参加者側を優先して
/// キャンセル待ちから取り除く。冪等な操作であり、二度かけても
/// それ以上は変化しない。
pub fn normalize(raw_participants: &[String], raw_waitlist: &[String]) -> (Roster, NormalizationReport) {
    let participants = normalize_list(raw_participants);
    let mut waitlist = normalize_list(raw_waitlist);
    waitlist.retain(|u| !participants.contains(u));

    let report = NormalizationReport {
        before_participants: raw_participants.len(),
        after_participants: participants.len(),
        before_waitlist: raw_waitlist.len(),
        after_waitlist: waitlist.len(),
    };
    (
        Roster {
            participants,
            waitlist,
        },
        report,
    )
}

fn normalize_list(raw: &[String]) -> Vec<UserId> {
    let mut cleaned: Vec<UserId> = Vec::with_capacity(raw.len());
    for entry in raw {
        if id::is_placeholder(entry) {
            continue;
        }
        let Ok(user_id) = entry.parse::<UserId>() else {
            continue;
        };
        if !cleaned.contains(&user_id) {
            cleaned.push(user_id);
        }
    }
    cleaned
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uid(s: &str) -> UserId {
        s.parse().unwrap()
    }

    fn roster(participants: &[&str], waitlist: &[&str]) -> Roster {
        Roster {
            participants: participants.iter().map(|s| uid(s)).collect(),
            waitlist: waitlist.iter().map(|s| uid(s)).collect(),
        }
    }

    fn assert_disjoint(r: &Roster) {
        for u in &r.participants {
            assert!(!r.waitlist.contains(u), "{u} is in both lists");
        }
        let mut p = r.participants.clone();
        p.dedup();
        assert_eq!(p.len(), r.participants.len(), "duplicate participant");
        let mut w = r.waitlist.clone();
        w.dedup();
        assert_eq!(w.len(), r.waitlist.len(), "duplicate waitlist entry");
    }

    #[test]
    fn join_places_participant_while_capacity_remains() {
        let mut r = Roster::default();
        let outcome = r.join(uid("line:U1"), 2);
        assert_eq!(outcome.placement, Placement::Participant);
        assert!(!outcome.already_joined);
        assert_eq!(r.participants, vec![uid("line:U1")]);
    }

    #[test]
    fn join_overflows_to_waitlist_in_fifo_order() {
        let mut r = Roster::default();
        r.join(uid("line:U1"), 1);
        r.join(uid("line:U2"), 1);
        r.join(uid("line:U3"), 1);
        assert_eq!(r.participants, vec![uid("line:U1")]);
        assert_eq!(r.waitlist, vec![uid("line:U2"), uid("line:U3")]);
        assert_disjoint(&r);
    }

    #[test]
    fn join_twice_is_identical_to_join_once() {
        let mut r = Roster::default();
        r.join(uid("line:U1"), 1);
        r.join(uid("line:U2"), 1);
        let snapshot = r.clone();

        let again = r.join(uid("line:U1"), 1);
        assert!(again.already_joined);
        assert_eq!(again.placement, Placement::Participant);

        let again = r.join(uid("line:U2"), 1);
        assert!(again.already_joined);
        assert_eq!(again.placement, Placement::Waitlisted);

        assert_eq!(r, snapshot);
    }

    #[test]
    fn join_at_zero_capacity_goes_straight_to_waitlist() {
        let mut r = Roster::default();
        let outcome = r.join(uid("line:U1"), 0);
        assert_eq!(outcome.placement, Placement::Waitlisted);
    }

    #[test]
    fn cancelling_participant_promotes_first_waitlisted() {
        // 参加者 [A, B]（定員 2）、キャンセル待ち [C, D]
        let mut r = roster(&["line:A", "line:B"], &["line:C", "line:D"]);

        let removal = r.remove(&uid("line:A"), true);
        assert!(removal.was_participant);
        assert_eq!(removal.promoted, Some(uid("line:C")));
        assert_eq!(r.participants, vec![uid("line:B"), uid("line:C")]);
        assert_eq!(r.waitlist, vec![uid("line:D")]);

        // キャンセル待ちのみの D が抜けても誰も繰り上がらない
        let removal = r.remove(&uid("line:D"), true);
        assert!(!removal.was_participant);
        assert!(removal.was_waitlisted);
        assert_eq!(removal.promoted, None);
        assert_eq!(r.participants, vec![uid("line:B"), uid("line:C")]);
        assert!(r.waitlist.is_empty());
    }

    #[test]
    fn removing_absent_user_is_a_no_op() {
        let mut r = roster(&["line:A"], &["line:B"]);
        let snapshot = r.clone();
        let removal = r.remove(&uid("line:Z"), true);
        assert!(!removal.was_participant);
        assert!(!removal.was_waitlisted);
        assert_eq!(removal.promoted, None);
        assert_eq!(r, snapshot);
    }

    #[test]
    fn forced_removal_without_promote_leaves_participants_untouched() {
        let mut r = roster(&["line:A", "line:B"], &["line:C", "line:D"]);
        let removal = r.remove(&uid("line:C"), false);
        assert!(removal.was_waitlisted);
        assert_eq!(removal.promoted, None);
        assert_eq!(r.participants, vec![uid("line:A"), uid("line:B")]);
        assert_eq!(r.waitlist, vec![uid("line:D")]);
    }

    #[test]
    fn forced_removal_of_participant_can_still_promote() {
        let mut r = roster(&["line:A", "line:B"], &["line:C"]);
        let removal = r.remove(&uid("line:B"), true);
        assert_eq!(removal.promoted, Some(uid("line:C")));
        assert_disjoint(&r);
    }

    #[test]
    fn promotion_skips_duplicate_already_in_participants() {
        // 壊れたデータ: C が両リストにいる
        let mut r = Roster {
            participants: vec![uid("line:A"), uid("line:C")],
            waitlist: vec![uid("line:C")],
        };
        let removal = r.remove(&uid("line:A"), true);
        assert_eq!(removal.promoted, Some(uid("line:C")));
        assert_eq!(r.participants, vec![uid("line:C")]);
        assert_disjoint(&r);
    }

    #[test]
    fn normalize_purges_corrupt_entries() {
        let raw_p: Vec<String> = ["dummy-user", "  line:U1  ", "line:U1", "bogus"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let (roster, report) = normalize(&raw_p, &[]);
        assert_eq!(roster.participants, vec![uid("line:U1")]);
        assert_eq!(report.before_participants, 4);
        assert_eq!(report.after_participants, 1);
        assert_eq!(report.removed(), 3);
        assert!(roster.differs_from(&raw_p, &[]));
    }

    #[test]
    fn whitespace_only_repair_is_detected_as_a_difference() {
        let raw_p: Vec<String> = vec!["  line:U1  ".into()];
        let (roster, report) = normalize(&raw_p, &[]);
        assert_eq!(report.removed(), 0);
        assert!(roster.differs_from(&raw_p, &[]));
    }

    #[test]
    fn normalize_is_idempotent() {
        let raw_p: Vec<String> = ["dummy-user", "  line:U1  ", "line:U1", "bogus"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let (first, _) = normalize(&raw_p, &[]);

        let again_p: Vec<String> = first.participants.iter().map(|u| u.to_string()).collect();
        let again_w: Vec<String> = first.waitlist.iter().map(|u| u.to_string()).collect();
        let (second, report) = normalize(&again_p, &again_w);
        assert_eq!(second, first);
        assert_eq!(report.removed(), 0);
        assert!(!second.differs_from(&again_p, &again_w));
    }

    #[test]
    fn normalize_prefers_participants_on_conflict() {
        let p: Vec<String> = vec!["line:U1".into(), "line:U2".into()];
        let w: Vec<String> = vec!["line:U2".into(), "line:U3".into()];
        let (roster, report) = normalize(&p, &w);
        assert_eq!(roster.participants, vec![uid("line:U1"), uid("line:U2")]);
        assert_eq!(roster.waitlist, vec![uid("line:U3")]);
        assert_eq!(report.removed(), 1);
        assert_disjoint(&roster);
    }
}
