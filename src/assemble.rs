use crate::Detection;
use crate::cluster::Cluster;
use crate::error::{Error, Result};

/// Converts surviving clusters into final output records.
///
/// The cluster box is the envelope (min/max over member boxes) and the
/// cluster score is the maximum member score; both are exactly invariant
/// under member permutation, which keeps repeated decodes byte-identical.
/// Output order is class index ascending, then score descending, with box
/// coordinates as the final tie break.
pub fn assemble_detections(clusters: &[Cluster], label_names: &[String]) -> Result<Vec<Detection>> {
    let mut scored: Vec<(usize, Detection)> = Vec::with_capacity(clusters.len());
    for cluster in clusters {
        let name = label_names
            .get(cluster.label)
            .ok_or(Error::LabelIndexOutOfRange {
                label: cluster.label,
                num_labels: label_names.len(),
            })?;
        let Some(first) = cluster.members.first() else {
            continue;
        };

        let mut envelope = first.bbox.to_canonical();
        let mut score = first.score;
        for member in &cluster.members[1..] {
            let bbox = member.bbox.to_canonical();
            envelope.xmin = envelope.xmin.min(bbox.xmin);
            envelope.ymin = envelope.ymin.min(bbox.ymin);
            envelope.xmax = envelope.xmax.max(bbox.xmax);
            envelope.ymax = envelope.ymax.max(bbox.ymax);
            score = score.max(member.score);
        }

        scored.push((
            cluster.label,
            Detection {
                label: name.clone(),
                score,
                bbox: envelope.into(),
            },
        ));
    }

    scored.sort_by(|(la, a), (lb, b)| {
        la.cmp(lb)
            .then(b.score.total_cmp(&a.score))
            .then(a.bbox.center_x.total_cmp(&b.bbox.center_x))
            .then(a.bbox.center_y.total_cmp(&b.bbox.center_y))
            .then(a.bbox.size_x.total_cmp(&b.bbox.size_x))
            .then(a.bbox.size_y.total_cmp(&b.bbox.size_y))
    });
    Ok(scored.into_iter().map(|(_, detection)| detection).collect())
}
