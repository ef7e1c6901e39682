//! Conductance scale normalization.
//!
//! Every receiving layer sums the input of its pathways per conductance
//! type. To keep converging pathways balanced, each pathway gets a raw
//! scale from a [`ScaleFn`] (sending activity, sending size, fan-in), which
//! is then divided by the summed relative weights of its [`GType`] group.
//! After normalization the relative weights of every non-empty group sum
//! to one.

use crate::path::{GScale, GType};

/// Raw input scale of a pathway before group normalization.
pub trait ScaleFn: Send + Sync {
    /// Scale for a pathway whose sending layer has nominal activity
    /// `send_act_avg` over `send_n` units, with `avg_cons` connections per
    /// receiving unit on average.
    fn raw_scale(&self, send_act_avg: f32, send_n: f32, avg_cons: f32) -> f32;
}

/// Scales by the inverse of the expected number of active senders.
///
/// With full connectivity that is the number of active units in the sending
/// layer. With partial connectivity it is the expected number of active
/// connections plus `sem_extra` standard errors, capped by what the layer
/// can deliver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SendActScale {
    pub sem_extra: i32,
}

impl Default for SendActScale {
    fn default() -> Self {
        Self { sem_extra: 2 }
    }
}

impl ScaleFn for SendActScale {
    fn raw_scale(&self, send_act_avg: f32, send_n: f32, avg_cons: f32) -> f32 {
        let ncon = avg_cons.max(1.0);
        let slay_act_n = ((send_act_avg * send_n).round() as i32).max(1);
        if ncon == send_n {
            return 1.0 / slay_act_n as f32;
        }
        let max_act_n = (ncon.min(slay_act_n as f32) as i32).max(1);
        let avg_act_n = ((send_act_avg * ncon).round() as i32).max(1);
        let exp_act_n = (avg_act_n + self.sem_extra).min(max_act_n);
        1.0 / exp_act_n as f32
    }
}

/// One receiving pathway as seen by [`normalize_groups`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GroupMember {
    pub gtype: GType,
    pub enabled: bool,
    /// Configured relative weight
    pub rel: f32,
    /// `abs * rel * raw_scale`, before normalization
    pub scale: f32,
}

/// Normalize the members of one receiving layer by conductance type.
///
/// Returns one [`GScale`] per member, in order. Disabled members, and all
/// members of a group whose enabled relative weights sum to zero, get zero
/// scale and relative weight.
pub fn normalize_groups(members: &[GroupMember]) -> Vec<GScale> {
    let mut tot_rel = [0.0f32; GType::N];
    for m in members.iter().filter(|m| m.enabled) {
        tot_rel[m.gtype.as_usize()] += m.rel;
    }
    members
        .iter()
        .map(|m| {
            let tot = tot_rel[m.gtype.as_usize()];
            if !m.enabled || tot <= 0.0 {
                GScale::default()
            } else {
                GScale {
                    scale: m.scale / tot,
                    rel: m.rel / tot,
                }
            }
        })
        .collect()
}
