//! Integration tests for Network build.
//!
//! Tests the arena allocation to verify:
//! - Layer and pool ranges
//! - Disabled pathways leave no trace
//! - Structural errors are collected into one report

use corticore::{
    CorticoreError, Full, LayerKind, Network, OneToOne, PathType, Result, Shape,
};

#[test]
fn test_4d_pool_partition() -> Result<()> {
    let mut net = Network::new("pools");
    net.add_layer_2d("Pre", 3, 3, LayerKind::Input)?;
    let ly = net.add_layer_4d("Grid", 2, 3, 4, 5, LayerKind::Super)?;
    net.build()?;

    let pools = net.layer_pools(ly)?;
    assert_eq!(pools.len(), 7);
    assert!(pools[0].is_layer_pool);
    assert_eq!((pools[0].start, pools[0].end), (0, 120));

    let mut next = 0;
    for pl in &pools[1..] {
        assert_eq!(pl.start, next);
        assert_eq!(pl.n(), 20);
        next = pl.end;
    }
    assert_eq!(next, 120);

    // every neuron carries its sub-pool
    for (ni, nrn) in net.layer_neurons(ly)?.iter().enumerate() {
        let pl = &pools[nrn.sub_pool as usize];
        assert!(!pl.is_layer_pool);
        assert!(pl.contains(ni as u32));
    }
    assert_eq!(net.layer(ly)?.neur_start(), 9);
    Ok(())
}

#[test]
fn test_disabled_path_excluded() -> Result<()> {
    let build = |disable: bool| -> Result<Network> {
        let mut net = Network::new("off");
        let a = net.add_layer_2d("A", 4, 4, LayerKind::Input)?;
        let b = net.add_layer_2d("B", 3, 3, LayerKind::Super)?;
        let c = net.add_layer_2d("C", 2, 2, LayerKind::Super)?;
        net.connect_layers(a, b, Box::new(Full::new()), PathType::Forward)?;
        let cb = net.connect_layers(c, b, Box::new(Full::new()), PathType::Forward)?;
        net.connect_layers(b, c, Box::new(OneToOne), PathType::Forward)?;
        if disable {
            net.set_path_off(cb, true)?;
        }
        net.build()?;
        Ok(net)
    };

    let on = build(false)?;
    let off = build(true)?;
    assert_eq!(on.stats().n_paths, 3);
    assert_eq!(off.stats().n_paths, 2);
    assert_eq!(on.synapses().len() - off.synapses().len(), 4 * 9);

    let cb = off.path_by_name("CToB")?;
    assert!(!cb.is_built());
    assert_eq!(cb.n_syns(), 0);
    assert_eq!(cb.gscale().rel, 0.0);
    assert!(off
        .synapses()
        .iter()
        .all(|syn| syn.path_index as usize != cb.index()));
    // the remaining pathway into B carries the whole group
    assert_eq!(off.path_by_name("AToB")?.gscale().rel, 1.0);

    // global tables hold only built pathways: recv units of AToB and BToC
    assert_eq!(off.path_recv_con().len(), 9 + 4);
    assert_eq!(off.path_send_con().len(), 16 + 9);
    Ok(())
}

#[test]
fn test_structural_errors_aggregated() {
    let mut net = Network::new("bad");
    let a = net.add_layer_2d("A", 2, 2, LayerKind::Input).unwrap();
    let empty = net.add_layer_2d("Empty", 0, 4, LayerKind::Super).unwrap();
    let flat = net.add_layer("Flat", Shape::new(&[8]), LayerKind::Super).unwrap();
    let b = net.add_layer_2d("B", 2, 2, LayerKind::Super).unwrap();
    net.connect_layers(a, empty, Box::new(Full::new()), PathType::Forward)
        .unwrap();
    net.connect_layers(flat, b, Box::new(Full::new()), PathType::Forward)
        .unwrap();
    let ab = net
        .connect_layers(a, b, Box::new(Full::new()), PathType::Forward)
        .unwrap();

    let errs = match net.build() {
        Err(CorticoreError::Build(errs)) => errs,
        other => panic!("expected aggregated build error, got {:?}", other),
    };
    assert_eq!(errs.len(), 2);
    assert!(matches!(errs.errors()[0], CorticoreError::ZeroUnits { .. }));
    assert!(matches!(
        errs.errors()[1],
        CorticoreError::UnsupportedShape { rank: 1, .. }
    ));
    let report = errs.to_string();
    assert!(report.contains("Empty"));
    assert!(report.contains("Flat"));

    // the rest of the network is still usable
    assert!(net.is_built());
    assert!(!net.layer(empty).unwrap().is_built());
    assert_eq!(net.neurons().len(), 8);
    assert_eq!(net.stats().n_paths, 1);
    assert_eq!(net.path(ab).unwrap().n_syns(), 16);
    assert!(net.layer_pools(flat).is_err());
}

#[test]
fn test_unknown_names() {
    let mut net = Network::new("names");
    net.add_layer_2d("A", 2, 2, LayerKind::Input).unwrap();
    assert!(matches!(
        net.connect_layer_names("A", "Nope", Box::new(Full::new()), PathType::Forward),
        Err(CorticoreError::UnknownLayer(ref n)) if n == "Nope"
    ));
    assert!(matches!(
        net.path_by_name("AToNope"),
        Err(CorticoreError::UnknownPath(_))
    ));
}

#[test]
fn test_stats_and_thread_defaults() -> Result<()> {
    let mut net = Network::new("stats");
    let a = net.add_layer_2d("A", 10, 10, LayerKind::Input)?;
    let b = net.add_layer_4d("B", 2, 2, 5, 5, LayerKind::Super)?;
    net.bidir_connect_layers(a, b, Full::new())?;
    net.build()?;

    let st = net.stats();
    assert_eq!(st.n_layers, 2);
    assert_eq!(st.n_neurons, 200);
    assert_eq!(st.n_pools, 1 + 5);
    assert_eq!(st.n_paths, 2);
    assert_eq!(st.n_synapses, 2 * 100 * 100);

    let th = net.threads();
    assert!(th.neurons >= 1 && th.send_spike >= 1 && th.syn_ca >= 1);
    assert!(th.syn_ca <= 2);
    Ok(())
}
