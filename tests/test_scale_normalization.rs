//! Integration tests for conductance scale normalization.

use approx::assert_relative_eq;
use corticore::{
    Full, GType, LayerKind, Network, OneToOne, PathId, PathType, Result, ScaleFn, UniformRand,
};

/// Three excitatory senders with relative weights 1, 1 and 2 onto one layer.
fn converging() -> Result<(Network, [PathId; 3])> {
    let mut net = Network::new("conv");
    let recv = net.add_layer_2d("Recv", 4, 4, LayerKind::Super)?;
    let mut ids = Vec::new();
    for (name, rel) in [("S1", 1.0), ("S2", 1.0), ("S3", 2.0)] {
        let s = net.add_layer_2d(name, 4, 4, LayerKind::Input)?;
        let pid = net.connect_layers(s, recv, Box::new(Full::new()), PathType::Forward)?;
        net.path_mut(pid)?.path_scale.rel = rel;
        ids.push(pid);
    }
    Ok((net, [ids[0], ids[1], ids[2]]))
}

#[test]
fn test_relative_weights_sum_to_one() -> Result<()> {
    let (mut net, ids) = converging()?;
    net.build()?;

    let rels: Vec<f32> = ids
        .iter()
        .map(|&pid| net.path(pid).map(|pt| pt.gscale().rel))
        .collect::<Result<_>>()?;
    assert_relative_eq!(rels[0], 0.25);
    assert_relative_eq!(rels[1], 0.25);
    assert_relative_eq!(rels[2], 0.5);
    assert_relative_eq!(rels.iter().sum::<f32>(), 1.0);

    // 16 senders at 10% activity, fully connected: raw 1/2, times rel, over 4
    let pt = net.path(ids[2])?;
    assert_relative_eq!(pt.gscale().scale, 0.5 * 2.0 / 4.0);

    // no inhibitory pathways: nothing in that group is non-zero
    for pt in net.paths() {
        if pt.com.gtype == GType::Inhibitory {
            assert_eq!(pt.gscale().rel, 0.0);
            assert_eq!(pt.gscale().scale, 0.0);
        }
    }
    Ok(())
}

#[test]
fn test_inhibitory_group_normalized_separately() -> Result<()> {
    let (mut net, ids) = converging()?;
    let recv = net.layer_id("Recv")?;
    let inhib = net.connect_layers(recv, recv, Box::new(Full::new()), PathType::Inhib)?;
    let off_inhib = {
        let s = net.layer_id("S1")?;
        net.connect_layers(s, recv, Box::new(OneToOne), PathType::Inhib)?
    };
    net.set_path_off(off_inhib, true)?;
    net.build()?;

    assert_relative_eq!(net.path(inhib)?.gscale().rel, 1.0);
    assert_eq!(net.path(off_inhib)?.gscale().rel, 0.0);
    assert_relative_eq!(net.path(ids[2])?.gscale().rel, 0.5);
    Ok(())
}

#[test]
fn test_renormalize_after_toggle() -> Result<()> {
    let (mut net, ids) = converging()?;
    net.build()?;

    net.set_path_off(ids[2], true)?;
    assert_relative_eq!(net.path(ids[0])?.gscale().rel, 0.5);
    assert_relative_eq!(net.path(ids[1])?.gscale().rel, 0.5);
    assert_eq!(net.path(ids[2])?.gscale().scale, 0.0);

    // totals reflect only enabled pathways, repeatably
    net.set_path_off(ids[2], true)?;
    assert_relative_eq!(net.path(ids[0])?.gscale().rel, 0.5);

    net.set_path_off(ids[2], false)?;
    assert_relative_eq!(net.path(ids[2])?.gscale().rel, 0.5);

    net.set_layer_off(net.layer_id("S1")?, true)?;
    assert_relative_eq!(net.path(ids[1])?.gscale().rel, 1.0 / 3.0);
    Ok(())
}

#[test]
fn test_gtype_override_forms_own_group() -> Result<()> {
    let (mut net, ids) = converging()?;
    net.path_mut(ids[2])?.com.gtype = GType::Modulatory;
    net.build()?;
    assert_relative_eq!(net.path(ids[0])?.gscale().rel, 0.5);
    assert_relative_eq!(net.path(ids[2])?.gscale().rel, 1.0);
    Ok(())
}

#[test]
fn test_partial_connectivity_raw_scale() -> Result<()> {
    let mut net = Network::new("partial");
    let s = net.add_layer_2d("S", 10, 10, LayerKind::Input)?;
    let r = net.add_layer_2d("R", 5, 5, LayerKind::Super)?;
    let pid = net.connect_layers(s, r, Box::new(UniformRand::new(0.2, 3)), PathType::Forward)?;
    net.build()?;
    // 20 cons at 10%: 2 expected active, plus 2
    assert_relative_eq!(net.path(pid)?.gscale().scale, 0.25);
    Ok(())
}

/// Scale function that ignores activity.
struct Unit;

impl ScaleFn for Unit {
    fn raw_scale(&self, _send_act_avg: f32, _send_n: f32, _avg_cons: f32) -> f32 {
        1.0
    }
}

#[test]
fn test_custom_scale_fn() -> Result<()> {
    let (mut net, ids) = converging()?;
    net.set_scale_fn(Box::new(Unit));
    net.build()?;
    for pid in ids {
        let gs = net.path(pid)?.gscale();
        assert_relative_eq!(gs.scale, gs.rel);
    }
    Ok(())
}
