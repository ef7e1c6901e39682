//! Integration tests for weight initialization and symmetry.

use corticore::{Full, LayerKind, Network, PathId, PathType, Result, UniformRand};

fn assert_symmetric(net: &Network, fwd: PathId, back: PathId, sn: usize, rn: usize) {
    for si in 0..sn {
        for ri in 0..rn {
            let (Some(a), Some(b)) = (net.syn_index(fwd, si, ri), net.syn_index(back, ri, si))
            else {
                continue;
            };
            let (sa, sb) = (&net.synapses()[a], &net.synapses()[b]);
            assert_eq!(sa.wt, sb.wt, "wt differs at {} -> {}", si, ri);
            assert_eq!(sa.swt, sb.swt);
            assert_eq!(sa.lwt, sb.lwt);
        }
    }
}

#[test]
fn test_bidir_weights_symmetric() -> Result<()> {
    let mut net = Network::new("sym");
    let a = net.add_layer_2d("A", 3, 3, LayerKind::Input)?;
    let b = net.add_layer_2d("B", 2, 2, LayerKind::Super)?;
    let (fwd, back) = net.bidir_connect_layers(a, b, Full::new())?;
    net.build()?;
    net.init_weights(17)?;
    assert_symmetric(&net, fwd, back, 9, 4);
    Ok(())
}

#[test]
fn test_copy_runs_from_lower_to_higher_layer() -> Result<()> {
    // declare the pathways back-first; the forward pathway still wins
    let mut net = Network::new("order");
    let a = net.add_layer_2d("A", 2, 2, LayerKind::Input)?;
    let b = net.add_layer_2d("B", 2, 2, LayerKind::Super)?;
    let back = net.connect_layers(b, a, Box::new(Full::new()), PathType::Back)?;
    let fwd = net.connect_layers(a, b, Box::new(Full::new()), PathType::Forward)?;
    net.build()?;
    net.init_weights(3)?;

    // rerun the random draw without symmetry to see each pathway's own weights
    let mut plain = Network::new("order");
    let pa = plain.add_layer_2d("A", 2, 2, LayerKind::Input)?;
    let pb = plain.add_layer_2d("B", 2, 2, LayerKind::Super)?;
    let pback = plain.connect_layers(pb, pa, Box::new(Full::new()), PathType::Back)?;
    let pfwd = plain.connect_layers(pa, pb, Box::new(Full::new()), PathType::Forward)?;
    plain.path_mut(pfwd)?.swt_init.sym = false;
    plain.path_mut(pback)?.swt_init.sym = false;
    plain.build()?;
    plain.init_weights(3)?;

    assert_eq!(net.path_synapses(fwd)?, plain.path_synapses(pfwd)?);
    assert_ne!(net.path_synapses(back)?, plain.path_synapses(pback)?);
    assert_symmetric(&net, fwd, back, 4, 4);
    Ok(())
}

#[test]
fn test_symmetry_is_opt_in() -> Result<()> {
    let mut net = Network::new("optin");
    let a = net.add_layer_2d("A", 3, 3, LayerKind::Input)?;
    let b = net.add_layer_2d("B", 3, 3, LayerKind::Super)?;
    let (fwd, back) = net.bidir_connect_layers(a, b, Full::new())?;
    net.path_mut(back)?.swt_init.sym = false;
    net.build()?;
    net.init_weights(5)?;

    let differs = (0..9).any(|si| {
        (0..9).any(|ri| net.syn_value(fwd, si, ri) != net.syn_value(back, ri, si))
    });
    assert!(differs);
    Ok(())
}

#[test]
fn test_partial_reciprocal_connectivity() -> Result<()> {
    // the two directions draw different random connections; only pairs
    // present in both are copied
    let mut net = Network::new("partial");
    let a = net.add_layer_2d("A", 4, 4, LayerKind::Input)?;
    let b = net.add_layer_2d("B", 4, 4, LayerKind::Super)?;
    let fwd = net.connect_layers(a, b, Box::new(UniformRand::new(0.5, 1)), PathType::Forward)?;
    let back = net.connect_layers(b, a, Box::new(UniformRand::new(0.5, 2)), PathType::Back)?;
    net.build()?;
    net.init_weights(8)?;
    assert_symmetric(&net, fwd, back, 16, 16);
    Ok(())
}

#[test]
fn test_lateral_self_symmetric() -> Result<()> {
    let mut net = Network::new("lat");
    let a = net.add_layer_2d("A", 3, 3, LayerKind::Super)?;
    let lat = net.lateral_connect_layer(a, Full::new())?;
    net.build()?;
    net.init_weights(11)?;
    assert_eq!(net.reciprocal_path(lat), Some(lat));
    assert_symmetric(&net, lat, lat, 9, 9);
    Ok(())
}

#[test]
fn test_inhib_not_symmetrized_by_default() -> Result<()> {
    let mut net = Network::new("inhib");
    let a = net.add_layer_2d("A", 2, 2, LayerKind::Super)?;
    let b = net.add_layer_2d("B", 2, 2, LayerKind::Super)?;
    let ab = net.connect_layers(a, b, Box::new(Full::new()), PathType::Inhib)?;
    let ba = net.connect_layers(b, a, Box::new(Full::new()), PathType::Inhib)?;
    assert!(!net.path(ab)?.swt_init.sym);
    net.build()?;
    net.init_weights(4)?;
    let differs = (0..4).any(|si| (0..4).any(|ri| net.syn_value(ab, si, ri) != net.syn_value(ba, ri, si)));
    assert!(differs);
    Ok(())
}
